//! Service agreements signed by the assigned caregiver.
//!
//! Agreements go to one sheet per service line (nurses, physiotherapists,
//! a-la-carte attendants). Each save also lands in a small index sheet keyed
//! by document hash so a printed agreement can be verified later without
//! scanning every service sheet.

use chrono::NaiveDateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::dates::{TIMESTAMP_FORMAT, format_cell_with_suffix};
use crate::document::{DocType, doc_hash, generate_filename};
use crate::error::{LedgerError, Result};
use crate::intake::ClientIntake;
use crate::plans::{Role, base_lists, display_name, infer_role};
use crate::record::LedgerRecord;
use crate::render::{AgreementView, render_agreement};
use crate::sheet::{RowView, SheetRow, SheetStore};

/// Sheet an agreement is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementSheet {
    Nurses,
    Physio,
    AlaCarte,
}

impl AgreementSheet {
    /// Physiotherapy plans file under Physio, a-la-carte under AlaCarte, the rest under Nurses.
    pub fn for_plan(plan: &str) -> Self {
        match infer_role(plan).0 {
            Role::Physiotherapist => AgreementSheet::Physio,
            Role::Attendant => AgreementSheet::AlaCarte,
            Role::Nurse | Role::Caregiver => AgreementSheet::Nurses,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AgreementSheet::Nurses => "Nurses",
            AgreementSheet::Physio => "Physio",
            AgreementSheet::AlaCarte => "A-la-carte",
        }
    }
}

/// Default agreement label.
pub const CAREGIVER_AGREEMENT: &str = "Caregiver Service Agreement";

const AGREEMENT_HEADERS: [&str; 14] = [
    "UID",
    "Ref Key",
    "Invoice Number",
    "Date",
    "Staff Name",
    "Staff Age",
    "Staff Address",
    "Staff ID",
    "Customer Name",
    "Location",
    "Plan",
    "Doc Type",
    "Saved At",
    "Doc Hash",
];

/// One saved agreement row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgreementRecord {
    pub uid: String,
    pub reference_key: String,
    pub invoice_number: String,
    pub date: String,
    pub staff_name: String,
    pub staff_age: String,
    pub staff_address: String,
    pub staff_id_number: String,
    pub customer_name: String,
    pub location: String,
    pub plan: String,
    pub doc_type: String,
    pub saved_at: String,
    pub doc_hash: String,
}

impl SheetRow for AgreementRecord {
    const SHEET: &'static str = "Agreements";

    fn headers() -> &'static [&'static str] {
        &AGREEMENT_HEADERS
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.uid.clone(),
            self.reference_key.clone(),
            self.invoice_number.clone(),
            self.date.clone(),
            self.staff_name.clone(),
            self.staff_age.clone(),
            self.staff_address.clone(),
            self.staff_id_number.clone(),
            self.customer_name.clone(),
            self.location.clone(),
            self.plan.clone(),
            self.doc_type.clone(),
            self.saved_at.clone(),
            self.doc_hash.clone(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Self {
        let cell = |h: &str| row.get(h).trim().to_string();
        AgreementRecord {
            uid: cell("UID"),
            reference_key: cell("Ref Key"),
            invoice_number: cell("Invoice Number"),
            date: cell("Date"),
            staff_name: cell("Staff Name"),
            staff_age: cell("Staff Age"),
            staff_address: cell("Staff Address"),
            staff_id_number: cell("Staff ID"),
            customer_name: cell("Customer Name"),
            location: cell("Location"),
            plan: cell("Plan"),
            doc_type: cell("Doc Type"),
            saved_at: cell("Saved At"),
            doc_hash: cell("Doc Hash"),
        }
    }
}

const INDEX_HEADERS: [&str; 6] = [
    "Doc Hash",
    "Invoice Number",
    "Customer Name",
    "Sheet",
    "Saved At",
    "Doc Type",
];

/// Row of the verification index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub doc_hash: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub sheet: String,
    pub saved_at: String,
    pub doc_type: String,
}

impl SheetRow for IndexEntry {
    const SHEET: &'static str = "Agreements_Index";

    fn headers() -> &'static [&'static str] {
        &INDEX_HEADERS
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.doc_hash.clone(),
            self.invoice_number.clone(),
            self.customer_name.clone(),
            self.sheet.clone(),
            self.saved_at.clone(),
            self.doc_type.clone(),
        ]
    }

    fn from_row(row: &RowView<'_>) -> Self {
        let cell = |h: &str| row.get(h).trim().to_string();
        IndexEntry {
            doc_hash: cell("Doc Hash"),
            invoice_number: cell("Invoice Number"),
            customer_name: cell("Customer Name"),
            sheet: cell("Sheet"),
            saved_at: cell("Saved At"),
            doc_type: cell("Doc Type"),
        }
    }
}

/// Whether an agreement of `doc_type` for this invoice and plan is already filed.
///
/// Invoice number and plan compare trimmed, the doc type case-insensitively.
/// Rows blank in all three columns are ignored.
pub fn already_saved(
    records: &[AgreementRecord],
    invoice_no: &str,
    plan: &str,
    doc_type: &str,
) -> bool {
    let invoice_no = invoice_no.trim();
    let plan = plan.trim();
    let doc_type = doc_type.trim().to_lowercase();

    records.iter().any(|r| {
        let (inv, p, d) = (r.invoice_number.trim(), r.plan.trim(), r.doc_type.trim());
        if inv.is_empty() && p.is_empty() && d.is_empty() {
            return false;
        }
        inv == invoice_no && p == plan && d.to_lowercase() == doc_type
    })
}

/// File an agreement and index it.
///
/// Refuses a second copy of the same agreement. The index write is best
/// effort: the agreement stays saved if it fails.
pub fn save_agreement<S, I>(
    sheet: &mut S,
    sheet_kind: AgreementSheet,
    index: &mut I,
    mut record: AgreementRecord,
    now: NaiveDateTime,
) -> Result<AgreementRecord>
where
    S: SheetStore<AgreementRecord>,
    I: SheetStore<IndexEntry>,
{
    if record.doc_type.trim().is_empty() {
        record.doc_type = CAREGIVER_AGREEMENT.to_string();
    }

    let existing = sheet.read_all()?;
    if already_saved(&existing, &record.invoice_number, &record.plan, &record.doc_type) {
        warn!(
            "{}: agreement for {} already exists, not saving",
            sheet_kind.name(),
            record.invoice_number
        );
        return Err(LedgerError::DuplicateAgreement {
            invoice_no: record.invoice_number,
            doc_type: record.doc_type,
        });
    }

    record.saved_at = now.format(TIMESTAMP_FORMAT).to_string();
    record.doc_hash = doc_hash(&[
        record.doc_type.as_str(),
        record.invoice_number.as_str(),
        record.customer_name.as_str(),
        record.saved_at.as_str(),
    ]);
    sheet.append(&record)?;
    info!(
        "{}: saved {} for {} ({})",
        sheet_kind.name(),
        record.doc_type,
        record.invoice_number,
        record.doc_hash
    );

    let entry = IndexEntry {
        doc_hash: record.doc_hash.clone(),
        invoice_number: record.invoice_number.clone(),
        customer_name: record.customer_name.clone(),
        sheet: sheet_kind.name().to_string(),
        saved_at: record.saved_at.clone(),
        doc_type: record.doc_type.clone(),
    };
    if let Err(e) = index.append(&entry) {
        warn!("index append failed for {}: {}", entry.doc_hash, e);
    }

    Ok(record)
}

/// Staff member named on an agreement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffDetails {
    pub name: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub id_number: String,
    /// Ignored when the plan locks the role.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Result of [`issue_agreement`].
#[derive(Debug, Clone, Serialize)]
pub struct IssuedAgreement {
    pub sheet: AgreementSheet,
    pub record: AgreementRecord,
    pub html: String,
    pub filename: String,
}

fn agreement_title(doc_type: DocType) -> &'static str {
    match doc_type {
        DocType::PatientAgreement => "Patient Service Agreement",
        _ => CAREGIVER_AGREEMENT,
    }
}

/// Draw up, file and render the agreement belonging to an issued invoice.
pub fn issue_agreement<S, I>(
    sheet: &mut S,
    index: &mut I,
    invoice: &LedgerRecord,
    client: &ClientIntake,
    staff: &StaffDetails,
    doc_type: DocType,
    now: NaiveDateTime,
) -> Result<IssuedAgreement>
where
    S: SheetStore<AgreementRecord>,
    I: SheetStore<IndexEntry>,
{
    let sheet_kind = AgreementSheet::for_plan(&client.plan);
    let (default_role, locked) = infer_role(&client.plan);
    let role = match staff.role {
        Some(role) if !locked => role,
        _ => default_role,
    };

    let record = AgreementRecord {
        uid: invoice.uid.clone(),
        reference_key: invoice.reference_key.clone(),
        invoice_number: invoice.identifier.clone(),
        date: invoice.date.clone(),
        staff_name: staff.name.trim().to_string(),
        staff_age: staff.age.trim().to_string(),
        staff_address: staff.address.trim().to_string(),
        staff_id_number: staff.id_number.trim().to_string(),
        customer_name: client.name.clone(),
        location: invoice.location.clone(),
        plan: client.plan.clone(),
        doc_type: doc_type.label().to_string(),
        ..AgreementRecord::default()
    };
    let record = save_agreement(sheet, sheet_kind, index, record, now)?;

    let (duties, _) = base_lists(&client.plan, &client.sub_service);
    let view = AgreementView {
        doc_label: agreement_title(doc_type).to_string(),
        invoice_number: record.invoice_number.clone(),
        date: format_cell_with_suffix(&record.date),
        role: role.label().to_string(),
        staff_name: record.staff_name.clone(),
        staff_age: record.staff_age.clone(),
        staff_address: record.staff_address.clone(),
        staff_id_number: record.staff_id_number.clone(),
        customer_name: record.customer_name.clone(),
        location: record.location.clone(),
        plan: display_name(&record.plan),
        duties,
        doc_hash: record.doc_hash.clone(),
    };
    let html = render_agreement(&view)?;
    let filename = generate_filename(doc_type, &record.invoice_number, &record.customer_name);

    Ok(IssuedAgreement {
        sheet: sheet_kind,
        record,
        html,
        filename,
    })
}

/// First index row carrying `hash`.
pub fn verify_doc_hash(index: &[IndexEntry], hash: &str) -> Option<IndexEntry> {
    let hash = hash.trim();
    if hash.is_empty() {
        return None;
    }
    index.iter().find(|e| e.doc_hash.trim() == hash).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::MemorySheet;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn agreement(invoice: &str) -> AgreementRecord {
        AgreementRecord {
            invoice_number: invoice.to_string(),
            plan: "Plan B: Skilled Nursing".to_string(),
            customer_name: "Asha Rao".to_string(),
            staff_name: "Meera".to_string(),
            ..AgreementRecord::default()
        }
    }

    #[test]
    fn sheet_follows_plan_role() {
        assert_eq!(AgreementSheet::for_plan("Plan B: Skilled Nursing"), AgreementSheet::Nurses);
        assert_eq!(AgreementSheet::for_plan("Plan F: Rehabilitative Care"), AgreementSheet::Physio);
        assert_eq!(AgreementSheet::for_plan("A-la-carte Services"), AgreementSheet::AlaCarte);
        assert_eq!(AgreementSheet::for_plan("Plan D: Elderly Companion"), AgreementSheet::Nurses);
    }

    #[test]
    fn save_stamps_hash_and_indexes() {
        let mut sheet: MemorySheet<AgreementRecord> = MemorySheet::new();
        let mut index: MemorySheet<IndexEntry> = MemorySheet::new();

        let saved = save_agreement(
            &mut sheet,
            AgreementSheet::Nurses,
            &mut index,
            agreement("PUN-240105-001"),
            now(),
        )
        .unwrap();

        assert_eq!(saved.doc_type, CAREGIVER_AGREEMENT);
        assert_eq!(saved.saved_at, "2024-01-05 09:30:00");
        assert_eq!(saved.doc_hash.len(), 16);
        assert_eq!(sheet.rows().len(), 1);

        let found = verify_doc_hash(index.rows(), &saved.doc_hash).unwrap();
        assert_eq!(found.sheet, "Nurses");
        assert_eq!(found.invoice_number, "PUN-240105-001");
        assert!(verify_doc_hash(index.rows(), "0000000000000000").is_none());
        assert!(verify_doc_hash(index.rows(), " ").is_none());
    }

    #[test]
    fn duplicate_save_is_refused() {
        let mut sheet: MemorySheet<AgreementRecord> = MemorySheet::new();
        let mut index: MemorySheet<IndexEntry> = MemorySheet::new();
        save_agreement(&mut sheet, AgreementSheet::Nurses, &mut index, agreement("X-1"), now()).unwrap();

        let mut again = agreement(" X-1 ");
        again.doc_type = "caregiver service AGREEMENT".to_string();
        let err = save_agreement(&mut sheet, AgreementSheet::Nurses, &mut index, again, now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateAgreement { .. }));
        assert_eq!(sheet.rows().len(), 1);
        assert_eq!(index.rows().len(), 1);
    }

    #[test]
    fn issued_agreement_follows_the_invoice() {
        let mut sheet: MemorySheet<AgreementRecord> = MemorySheet::new();
        let mut index: MemorySheet<IndexEntry> = MemorySheet::new();
        let invoice = LedgerRecord {
            uid: "0004".to_string(),
            identifier: "KOP-240105-002".to_string(),
            reference_key: "12-1".to_string(),
            date: "05-01-2024".to_string(),
            location: "Kolhapur".to_string(),
            ..LedgerRecord::default()
        };
        let client = ClientIntake {
            name: "Asha Rao".to_string(),
            plan: "Plan F: Rehabilitative Care".to_string(),
            sub_service: "Exercise Therapy".to_string(),
            ..ClientIntake::default()
        };
        let staff = StaffDetails {
            name: " Meera ".to_string(),
            role: Some(Role::Nurse),
            ..StaffDetails::default()
        };

        let issued = issue_agreement(
            &mut sheet,
            &mut index,
            &invoice,
            &client,
            &staff,
            DocType::NurseAgreement,
            now(),
        )
        .unwrap();

        assert_eq!(issued.sheet, AgreementSheet::Physio);
        assert_eq!(issued.record.invoice_number, "KOP-240105-002");
        assert_eq!(issued.record.staff_name, "Meera");
        assert_eq!(issued.record.doc_type, "Nurse");
        assert_eq!(issued.filename, "NU-KOP-240105-002-ASHA-RAO.pdf");
        // plan F locks the role
        assert!(issued.html.contains("Physiotherapist: Meera"));
        assert!(issued.html.contains("Jan. 5th 2024"));
        assert!(issued.html.contains("<li>Exercise Therapy</li>"));
        assert_eq!(index.rows().len(), 1);
    }

    #[test]
    fn blank_rows_never_match() {
        let records = vec![AgreementRecord::default()];
        assert!(!already_saved(&records, "", "", ""));
    }
}
