#![cfg(not(tarpaulin_include))]

use chrono::Local;
use invoice_ledger::config::AppConfig;
use invoice_ledger::conflict::{ExclusionLists, find_active_record, is_service_ended};
use invoice_ledger::dates::parse_date;
use invoice_ledger::identifier::{Location, PartitionKey, allocate, next_uid};
use invoice_ledger::invoice::end_service;
use invoice_ledger::record::LedgerRecord;
use invoice_ledger::sheet::{CsvSheet, SheetStore};
use invoice_ledger::snapshot::save_snapshot;

use std::env;
use std::io::{self, Write};
use std::time::Instant;

fn print_help() {
    println!("Commands:");
    println!("  next <date> <location>: Preview the next invoice number");
    println!("  uid: Preview the next UID");
    println!("  active <ref>: Show the client's active record and its file name");
    println!("  ended <ref>: Whether the client's latest engagement has ended");
    println!("  end <ref>: End the client's active engagement");
    println!("  list: Print every ledger row");
    println!("  keys: Print reference keys in the ledger, and those already ended");
    println!("  backup <path>: Write a compressed ledger backup");
    println!("  q: Quit");
}

fn print_record(record: &LedgerRecord) {
    println!(
        "{:>5}  {:<16} {:<10} {:<10} {:<24} {:>10}  {}",
        record.uid,
        record.identifier,
        record.reference_key,
        record.date,
        record.customer_name,
        record.billing_qty,
        if record.is_active() {
            "active"
        } else {
            record.service_ended.as_str()
        }
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let ledger_path = match args.get(1) {
        Some(path) => path.into(),
        None => AppConfig::load_or_default("ledger.json")?.ledger_path,
    };
    let mut sheet: CsvSheet<LedgerRecord> = CsvSheet::new(&ledger_path);
    println!("Ledger: {}", ledger_path.display());

    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    loop {
        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();
        start_time = Instant::now();

        let mut parts = command.split_whitespace();
        let Some(verb) = parts.next() else {
            status = String::from("invalid command");
            continue;
        };
        let rest: Vec<&str> = parts.collect();

        // Every command sees the ledger as it is on disk right now
        let ledger = match sheet.read_all() {
            Ok(ledger) => ledger,
            Err(e) => {
                status = format!("read failed: {}", e);
                continue;
            }
        };

        status = match (verb, rest.as_slice()) {
            ("q", _) => break,
            ("help", _) => {
                print_help();
                String::from("ok")
            }
            ("next", [date, location @ ..]) if !location.is_empty() => match parse_date(date) {
                Some(date) => {
                    let location = location.join(" ");
                    let location = Location::from_code(&location)
                        .unwrap_or_else(|| Location::infer(&location));
                    let partition = PartitionKey::new(location, date);
                    println!("{}", allocate(&partition, &ledger));
                    String::from("ok")
                }
                None => String::from("invalid date"),
            },
            ("uid", []) => {
                println!("{}", next_uid(&ledger));
                String::from("ok")
            }
            ("active", [reference_key]) => match find_active_record(reference_key, &ledger) {
                Some(record) => {
                    print_record(record);
                    println!("{}", record.filename());
                    String::from("ok")
                }
                None => String::from("no active record"),
            },
            ("ended", [reference_key]) => {
                println!("{}", is_service_ended(reference_key, &ledger));
                String::from("ok")
            }
            ("end", [reference_key]) => {
                match end_service(&mut sheet, reference_key, Local::now().naive_local()) {
                    Ok(record) => {
                        print_record(&record);
                        String::from("ok")
                    }
                    Err(e) => e.to_string(),
                }
            }
            ("list", []) => {
                for record in &ledger {
                    print_record(record);
                }
                format!("{} rows", ledger.len())
            }
            ("keys", []) => {
                let lists = ExclusionLists::scan(&ledger);
                println!("present: {}", lists.present.join(" "));
                println!("ended: {}", lists.ended.join(" "));
                format!("{} keys", lists.present.len())
            }
            ("backup", [path]) => match save_snapshot(&ledger, path) {
                Ok(()) => String::from("ok"),
                Err(e) => e.to_string(),
            },
            _ => String::from("invalid command"),
        };
    }

    Ok(())
}
