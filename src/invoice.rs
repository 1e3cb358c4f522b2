//! Issuing invoices against the ledger and closing engagements.

use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use serde::{Deserialize, Serialize};

use crate::billing::{BillingLine, service_description};
use crate::conflict::{Resolution, find_active_index};
use crate::dates::{TIMESTAMP_FORMAT, format_date_simple, format_date_with_suffix, parse_date};
use crate::document::{DocType, generate_filename};
use crate::error::{LedgerError, Result};
use crate::identifier::{PartitionKey, allocate, next_uid};
use crate::intake::ClientIntake;
use crate::plans::{base_lists, display_name};
use crate::record::LedgerRecord;
use crate::render::{InvoiceView, render_invoice};
use crate::sheet::SheetStore;

/// Parameters staff choose when generating an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub client: ClientIntake,
    pub date: NaiveDate,
    /// Number of billing periods paid for.
    pub quantity: u32,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "default_doc_type")]
    pub doc_type: DocType,
}

fn default_doc_type() -> DocType {
    DocType::Invoice
}

/// Result of [`issue_invoice`].
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvoice {
    pub record: LedgerRecord,
    pub html: String,
    pub filename: String,
    /// True when an active row was rewritten instead of a new one appended.
    pub replaced: bool,
}

/// Build the ledger row for `request`, leaving the invoice number and UID blank.
fn draft_record(request: &InvoiceRequest, line: &BillingLine, now: NaiveDateTime) -> LedgerRecord {
    let client = &request.client;
    let location = if client.location.trim().is_empty() {
        client.office().city().to_string()
    } else {
        client.location.trim().to_string()
    };
    LedgerRecord {
        reference_key: client.reference_key(),
        date: format_date_simple(request.date),
        location,
        customer_name: client.name.clone(),
        mobile: client.mobile.clone(),
        plan: client.plan.clone(),
        billing_qty: request.quantity,
        amount: line.total,
        doc_type: request.doc_type.label().to_string(),
        created_at: now.format(TIMESTAMP_FORMAT).to_string(),
        ..LedgerRecord::default()
    }
}

fn invoice_view(request: &InvoiceRequest, record: &LedgerRecord, line: &BillingLine) -> InvoiceView {
    let client = &request.client;
    let (included, not_included) = base_lists(&client.plan, &client.sub_service);
    let date = parse_date(&record.date).unwrap_or(request.date);
    let (service_line, duration_line) = service_description(
        &client.shift,
        &client.period,
        line.visits_needed,
        client.is_recurring(),
    );
    InvoiceView {
        doc_label: request.doc_type.label().to_string(),
        invoice_number: record.identifier.clone(),
        uid: record.uid.clone(),
        date: format_date_with_suffix(date),
        customer_name: client.name.clone(),
        mobile: client.mobile.clone(),
        address: client.address.clone(),
        plan: display_name(&client.plan),
        service_line,
        duration_line,
        rate_line: line.rate_line.clone(),
        included,
        not_included,
        paid_for: line.paid_for.clone(),
        total: line.total_display(),
        note: line.note.clone(),
        referral_name: client.referral_name.clone(),
    }
}

/// Issue an invoice for `request.client`.
///
/// The ledger is read once. If the client has an active record the request's
/// [`Resolution`] decides: `Block` fails with
/// [`LedgerError::ActiveEngagement`], `Overwrite` rewrites that row keeping
/// its invoice number, UID, date and location (the cells the number's
/// partition is derived from), `ForceNew` allocates fresh ones. Without an
/// active record a fresh number is always allocated and the row appended.
pub fn issue_invoice<S>(
    store: &mut S,
    request: &InvoiceRequest,
    now: NaiveDateTime,
) -> Result<IssuedInvoice>
where
    S: SheetStore<LedgerRecord>,
{
    let ledger = store.read_all()?;
    let client = &request.client;
    let (unit_rate, visits) = client.billing_basis();
    let line = BillingLine::compute(
        unit_rate,
        request.quantity,
        visits,
        &client.shift,
        &client.period,
    );
    let mut record = draft_record(request, &line, now);

    let active = find_active_index(&record.reference_key, &ledger);
    let replaced = match (active, request.resolution) {
        (Some(index), Resolution::Block) => {
            return Err(LedgerError::ActiveEngagement {
                reference_key: record.reference_key,
                identifier: ledger[index].identifier.clone(),
            });
        }
        (Some(index), Resolution::Overwrite) => {
            let kept = &ledger[index];
            record.identifier = kept.identifier.clone();
            record.uid = kept.uid.clone();
            record.date = kept.date.clone();
            record.location = kept.location.clone();
            store.update(index, &record)?;
            info!("overwrote {} for {}", record.identifier, record.reference_key);
            true
        }
        (_, _) => {
            let partition = PartitionKey::new(client.office(), request.date);
            record.identifier = allocate(&partition, &ledger).to_string();
            record.uid = next_uid(&ledger);
            store.append(&record)?;
            info!(
                "issued {} (uid {}) for {}",
                record.identifier, record.uid, record.reference_key
            );
            false
        }
    };

    let html = render_invoice(&invoice_view(request, &record, &line))?;
    let filename = generate_filename(request.doc_type, &record.identifier, &client.name);
    Ok(IssuedInvoice {
        record,
        html,
        filename,
        replaced,
    })
}

/// Close the client's active engagement by stamping `Service Ended`.
pub fn end_service<S>(store: &mut S, reference_key: &str, now: NaiveDateTime) -> Result<LedgerRecord>
where
    S: SheetStore<LedgerRecord>,
{
    let ledger = store.read_all()?;
    let Some(index) = find_active_index(reference_key, &ledger) else {
        return Err(LedgerError::NoActiveRecord {
            reference_key: reference_key.trim().to_string(),
        });
    };

    let mut record = ledger[index].clone();
    record.service_ended = now.format(TIMESTAMP_FORMAT).to_string();
    store.update(index, &record)?;
    info!("ended service {} for {}", record.identifier, record.reference_key);
    Ok(record)
}
