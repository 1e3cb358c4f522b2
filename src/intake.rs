use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::billing::parse_visits;
use crate::error::{LedgerError, Result};
use crate::identifier::Location;
use crate::normalize::{clean_referral_field, normalize_id};
use crate::record::reference_key;
use crate::sheet::{RowView, SheetRow, parse_csv};

const INTAKE_HEADERS: [&str; 21] = [
    "Serial No.",
    "Ref. No.",
    "Name",
    "Mobile",
    "Location",
    "Address",
    "Gender",
    "Age",
    "Service Required",
    "Sub Service",
    "Unit Rate",
    "Final Rate",
    "Shift",
    "Period",
    "Visits",
    "Call Date",
    "Notes",
    "Recurring Service",
    "Referral Code",
    "Referral Name",
    "Referral Credit",
];

/// One client row from the intake spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientIntake {
    pub serial_no: String,
    pub ref_no: String,
    pub name: String,
    pub mobile: String,
    pub location: String,
    pub address: String,
    pub gender: String,
    pub age: String,
    pub plan: String,
    pub sub_service: String,
    pub unit_rate: f64,
    /// Quoted amount for the whole engagement.
    pub final_rate: f64,
    pub shift: String,
    pub period: String,
    pub visits: u32,
    pub call_date: String,
    pub notes: String,
    /// `Yes` for open-ended engagements.
    pub recurring: String,
    pub referral_code: String,
    pub referral_name: String,
    pub referral_credit: String,
}

impl ClientIntake {
    /// Engagement key shared by every ledger row for this client.
    pub fn reference_key(&self) -> String {
        reference_key(&self.ref_no, &self.serial_no)
    }

    /// Picker label: `Name (Mobile)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.mobile)
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring.trim().eq_ignore_ascii_case("yes")
    }

    /// Unit rate and visit count to bill with.
    ///
    /// When only the final rate was filled in, the unit rate is derived from
    /// it (whole rupees per visit), and a blank visit count reads as one.
    pub fn billing_basis(&self) -> (f64, u32) {
        let mut unit_rate = self.unit_rate;
        let mut visits = self.visits;
        if self.final_rate > 0.0 {
            if unit_rate == 0.0 && visits > 0 {
                unit_rate = (self.final_rate / visits as f64).trunc();
            }
            if visits == 0 {
                visits = 1;
                if unit_rate == 0.0 {
                    unit_rate = self.final_rate;
                }
            }
        }
        (unit_rate, visits)
    }

    /// Office the client is billed from; the location cell wins over the address.
    pub fn office(&self) -> Location {
        if self.location.trim().is_empty() {
            Location::infer(&self.address)
        } else {
            Location::infer(&self.location)
        }
    }
}

impl SheetRow for ClientIntake {
    const SHEET: &'static str = "Intake";

    fn headers() -> &'static [&'static str] {
        &INTAKE_HEADERS
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.serial_no.clone(),
            self.ref_no.clone(),
            self.name.clone(),
            self.mobile.clone(),
            self.location.clone(),
            self.address.clone(),
            self.gender.clone(),
            self.age.clone(),
            self.plan.clone(),
            self.sub_service.clone(),
            self.unit_rate.to_string(),
            self.final_rate.to_string(),
            self.shift.clone(),
            self.period.clone(),
            self.visits.to_string(),
            self.call_date.clone(),
            self.notes.clone(),
            self.recurring.clone(),
            self.referral_code.clone(),
            self.referral_name.clone(),
            self.referral_credit.clone(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Self {
        let text = |h: &str| row.get(h).trim().to_string();
        ClientIntake {
            serial_no: normalize_id(row.get("Serial No.")),
            ref_no: normalize_id(row.get("Ref. No.")),
            name: text("Name"),
            mobile: normalize_id(row.get("Mobile")),
            location: text("Location"),
            address: text("Address"),
            gender: text("Gender"),
            age: normalize_id(row.get("Age")),
            plan: text("Service Required"),
            sub_service: text("Sub Service"),
            unit_rate: parse_amount(row.get("Unit Rate")),
            final_rate: parse_amount(row.get("Final Rate")),
            shift: text("Shift"),
            period: text("Period"),
            visits: parse_visits(row.get("Visits")),
            call_date: text("Call Date"),
            notes: text("Notes"),
            recurring: text("Recurring Service"),
            referral_code: clean_referral_field(row.get("Referral Code")),
            referral_name: clean_referral_field(row.get("Referral Name")),
            referral_credit: clean_referral_field(row.get("Referral Credit")),
        }
    }
}

fn parse_amount(cell: &str) -> f64 {
    cell.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Sheet read from an intake workbook when present; otherwise the first.
pub const CONFIRMED_SHEET: &str = "Confirmed";

fn clients_from_table(headers: &[String], rows: &[Vec<String>]) -> Vec<ClientIntake> {
    let mut clients = Vec::new();
    for (i, values) in rows.iter().enumerate() {
        let view = RowView::new(headers, values);
        if view.is_blank() {
            continue;
        }
        let client = ClientIntake::from_row(&view);
        if client.name.is_empty() {
            warn!("intake row {} has no client name, skipping", i + 2);
            continue;
        }
        clients.push(client);
    }
    debug!("parsed {} intake rows", clients.len());
    clients
}

/// Parse intake CSV text. Rows without a client name are dropped.
pub fn parse_intake(content: &str) -> Result<Vec<ClientIntake>> {
    let mut records = parse_csv(content)?;
    if records.is_empty() {
        return Err(LedgerError::Csv {
            line: 1,
            detail: "intake file is empty".to_string(),
        });
    }
    let headers = records.remove(0);
    Ok(clients_from_table(&headers, &records))
}

#[cfg(feature = "xlsx")]
fn cell_text(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // 7.0 prints as "7", matching what normalize_id expects
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

/// Read the intake workbook: the `Confirmed` sheet, or the first sheet
/// when there is none. Rows go through the same header lookup as CSV.
#[cfg(feature = "xlsx")]
pub fn read_intake_workbook(path: &Path) -> Result<Vec<ClientIntake>> {
    use calamine::{Reader, open_workbook_auto};

    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let sheet_name = names
        .iter()
        .find(|name| name.trim() == CONFIRMED_SHEET)
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| LedgerError::Workbook(format!("{} has no sheets", path.display())))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    if rows.is_empty() {
        return Err(LedgerError::Workbook(format!("sheet '{}' is empty", sheet_name)));
    }
    let headers = rows.remove(0);
    debug!("reading intake sheet '{}' from {}", sheet_name, path.display());
    Ok(clients_from_table(&headers, &rows))
}

#[cfg(not(feature = "xlsx"))]
pub fn read_intake_workbook(path: &Path) -> Result<Vec<ClientIntake>> {
    Err(LedgerError::Workbook(format!(
        "{}: workbook intake needs the `xlsx` feature",
        path.display()
    )))
}

/// Load the intake sheet, dispatching on the file extension.
pub fn load_intake(path: impl AsRef<Path>) -> Result<Vec<ClientIntake>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => parse_intake(&fs::read_to_string(path)?),
        Some("xlsx" | "xlsm" | "xls" | "ods") => read_intake_workbook(path),
        Some(ext) => Err(LedgerError::Csv {
            line: 0,
            detail: format!("unsupported intake file extension: {}", ext),
        }),
        None => Err(LedgerError::Csv {
            line: 0,
            detail: "intake file has no extension".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Serial No.,Ref. No.,Name,Mobile,Location,Address,Service Required,Sub Service,Unit Rate,Shift,Period,Visits,Referral Code
1.0,12,Asha Rao,9876543210.0,,\"Flat 4, Andheri, Mumbai\",Plan B: Skilled Nursing,All,\"1,800\",24-hr,Daily,30.0,nan
2,13,,,,,,,,,,,
3,14,Vikram Patil,9000000000,Kolhapur,,Plan F: Rehabilitative Care,Exercise Therapy,700,Per Visit,,6,R-9
";

    #[test]
    fn parses_rows_and_cleans_spreadsheet_noise() {
        let clients = parse_intake(SAMPLE).unwrap();
        assert_eq!(clients.len(), 2);

        let asha = &clients[0];
        assert_eq!(asha.serial_no, "1");
        assert_eq!(asha.mobile, "9876543210");
        assert_eq!(asha.unit_rate, 1800.0);
        assert_eq!(asha.visits, 30);
        assert_eq!(asha.referral_code, "");
        assert_eq!(asha.reference_key(), "12-1");
        assert_eq!(asha.label(), "Asha Rao (9876543210)");
        assert_eq!(asha.office(), Location::Mumbai);

        let vikram = &clients[1];
        assert_eq!(vikram.office(), Location::Kolhapur);
        assert_eq!(vikram.referral_code, "R-9");
        assert_eq!(vikram.notes, "");
    }

    #[test]
    fn empty_file_is_an_error() {
        assert!(parse_intake("").is_err());
    }

    #[test]
    fn rejects_unknown_extensions() {
        let err = load_intake("clients.txt").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
        assert!(load_intake("clients").is_err());
    }

    #[test]
    fn final_rate_and_recurrence_columns() {
        let csv = "\
Serial No.,Ref. No.,Name,Unit Rate,Final Rate,Visits,Recurring Service
1,20,Rekha Joshi,0,\"9,000\",30,Yes
2,21,Sunil More,,4500,,no
3,22,Leela Kale,1500,,6.0,
";
        let clients = parse_intake(csv).unwrap();

        let rekha = &clients[0];
        assert_eq!(rekha.final_rate, 9000.0);
        assert!(rekha.is_recurring());
        assert_eq!(rekha.billing_basis(), (300.0, 30));

        let sunil = &clients[1];
        assert!(!sunil.is_recurring());
        assert_eq!(sunil.billing_basis(), (4500.0, 1));

        let leela = &clients[2];
        assert_eq!(leela.billing_basis(), (1500.0, 6));
    }

    #[cfg(feature = "xlsx")]
    fn write_workbook(path: &std::path::Path, sheets: &[&str]) {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        for (n, name) in sheets.iter().enumerate() {
            let sheet = workbook.add_worksheet();
            sheet.set_name(*name).unwrap();
            for (c, header) in ["Serial No.", "Ref. No.", "Name", "Mobile", "Location", "Unit Rate"]
                .iter()
                .enumerate()
            {
                sheet.write_string(0, c as u16, *header).unwrap();
            }
            sheet.write_number(1, 0, 1.0).unwrap();
            sheet.write_number(1, 1, 40.0 + n as f64).unwrap();
            sheet.write_string(1, 2, &format!("Client of {}", name)).unwrap();
            sheet.write_number(1, 3, 9876543210.0).unwrap();
            sheet.write_string(1, 4, "Kolhapur").unwrap();
            sheet.write_number(1, 5, 1200.0).unwrap();
        }
        workbook.save(path).unwrap();
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn workbook_intake_prefers_the_confirmed_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intake.xlsx");
        write_workbook(&path, &["Leads", "Confirmed"]);

        let clients = load_intake(&path).unwrap();
        assert_eq!(clients.len(), 1);
        let client = &clients[0];
        assert_eq!(client.name, "Client of Confirmed");
        assert_eq!(client.reference_key(), "41-1");
        assert_eq!(client.mobile, "9876543210");
        assert_eq!(client.unit_rate, 1200.0);
        assert_eq!(client.office(), Location::Kolhapur);
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn workbook_without_confirmed_sheet_reads_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intake.xlsx");
        write_workbook(&path, &["Leads", "Archive"]);

        let clients = load_intake(&path).unwrap();
        assert_eq!(clients[0].name, "Client of Leads");
        assert_eq!(clients[0].reference_key(), "40-1");
    }

    #[cfg(not(feature = "xlsx"))]
    #[test]
    fn workbook_intake_reports_the_missing_feature() {
        let err = load_intake("clients.xlsx").unwrap_err();
        assert!(matches!(err, LedgerError::Workbook(_)));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intake.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_intake(&path).unwrap().len(), 2);
    }
}
