use serde::{Deserialize, Serialize};

use crate::dates::parse_date;
use crate::document::{DocType, generate_filename};
use crate::identifier::{Location, PartitionKey};
use crate::normalize::{CellValue, normalize_id};
use crate::sheet::{RowView, SheetRow};

/// Column headers of the ledger sheet, in write order.
pub const LEDGER_HEADERS: [&str; 13] = [
    "UID",
    "Invoice Number",
    "Ref Key",
    "Date",
    "Location",
    "Customer Name",
    "Mobile",
    "Plan",
    "Billing Qty",
    "Amount",
    "Doc Type",
    "Created At",
    "Service Ended",
];

/// One row of the transaction ledger.
///
/// A row is appended for every issued invoice. It is never deleted; the
/// engagement it belongs to is closed by stamping `service_ended`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Global 4-digit counter, see [`crate::identifier::next_uid`].
    pub uid: String,
    /// Invoice number, `LOC-YYMMDD-NNN`.
    pub identifier: String,
    /// Stable key of the client engagement (`ref-serial`).
    pub reference_key: String,
    /// Issue date, `DD-MM-YYYY`.
    pub date: String,
    /// Free-text location as captured at intake.
    pub location: String,
    pub customer_name: String,
    pub mobile: String,
    pub plan: String,
    pub billing_qty: u32,
    pub amount: f64,
    pub doc_type: String,
    pub created_at: String,
    /// Blank while the engagement is active, a timestamp once ended.
    pub service_ended: String,
}

impl LedgerRecord {
    pub fn is_active(&self) -> bool {
        self.service_ended.trim().is_empty()
    }

    /// Partition this record's invoice number was allocated in, re-derived
    /// from its own date and location cells.
    pub fn partition_key(&self) -> Option<PartitionKey> {
        let date = parse_date(&self.date)?;
        Some(PartitionKey::new(Location::infer(&self.location), date))
    }

    /// Download name of the document this row was issued for. Rows with an
    /// unknown `Doc Type` are named as invoices.
    pub fn filename(&self) -> String {
        let doc_type = DocType::from_label(&self.doc_type).unwrap_or(DocType::Invoice);
        generate_filename(doc_type, &self.identifier, &self.customer_name)
    }
}

impl SheetRow for LedgerRecord {
    const SHEET: &'static str = "Ledger";

    fn headers() -> &'static [&'static str] {
        &LEDGER_HEADERS
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.uid.clone(),
            self.identifier.clone(),
            self.reference_key.clone(),
            self.date.clone(),
            self.location.clone(),
            self.customer_name.clone(),
            self.mobile.clone(),
            self.plan.clone(),
            self.billing_qty.to_string(),
            format_amount(self.amount),
            self.doc_type.clone(),
            self.created_at.clone(),
            self.service_ended.clone(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Self {
        LedgerRecord {
            uid: row.get("UID").trim().to_string(),
            identifier: row.get("Invoice Number").trim().to_string(),
            reference_key: normalize_reference_key(row.get("Ref Key")),
            date: row.get("Date").trim().to_string(),
            location: row.get("Location").trim().to_string(),
            customer_name: row.get("Customer Name").trim().to_string(),
            mobile: normalize_id(row.get("Mobile")),
            plan: row.get("Plan").trim().to_string(),
            billing_qty: normalize_id(row.get("Billing Qty")).parse().unwrap_or(0),
            amount: row.get("Amount").trim().replace(',', "").parse().unwrap_or(0.0),
            doc_type: row.get("Doc Type").trim().to_string(),
            created_at: row.get("Created At").trim().to_string(),
            service_ended: row.get("Service Ended").trim().to_string(),
        }
    }
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// Engagement key for a client: normalized reference number and serial number.
///
/// # Examples
/// ```
/// use invoice_ledger::record::reference_key;
///
/// assert_eq!(reference_key("12.0", 3), "12-3");
/// ```
pub fn reference_key(ref_no: impl Into<CellValue>, serial_no: impl Into<CellValue>) -> String {
    format!("{}-{}", normalize_id(ref_no), normalize_id(serial_no))
}

/// Normalize a stored engagement key segment by segment, so `12.0-1.0`
/// and `7.0` compare equal to `12-1` and `7`.
///
/// # Examples
/// ```
/// use invoice_ledger::record::normalize_reference_key;
///
/// assert_eq!(normalize_reference_key(" 12.0-1.0 "), "12-1");
/// assert_eq!(normalize_reference_key("REF1"), "REF1");
/// ```
pub fn normalize_reference_key(raw: &str) -> String {
    raw.trim()
        .split('-')
        .map(normalize_id)
        .collect::<Vec<_>>()
        .join("-")
}
