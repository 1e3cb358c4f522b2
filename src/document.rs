use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-zA-Z0-9]").unwrap();
}

/// Kind of document the tool produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    Invoice,
    NurseAgreement,
    PatientAgreement,
    DuplicateInvoice,
}

impl DocType {
    /// Label written to the `Doc Type` column.
    pub fn label(self) -> &'static str {
        match self {
            DocType::Invoice => "Invoice",
            DocType::NurseAgreement => "Nurse",
            DocType::PatientAgreement => "Patient",
            DocType::DuplicateInvoice => "DUPLICATE INVOICE",
        }
    }

    pub fn file_prefix(self) -> &'static str {
        match self {
            DocType::Invoice => "IN",
            DocType::NurseAgreement => "NU",
            DocType::PatientAgreement => "PA",
            DocType::DuplicateInvoice => "DUP",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "invoice" => Some(DocType::Invoice),
            "nurse" => Some(DocType::NurseAgreement),
            "patient" => Some(DocType::PatientAgreement),
            "duplicate invoice" => Some(DocType::DuplicateInvoice),
            _ => None,
        }
    }
}

/// Download name for a document, e.g. `IN-PUN-240101-001-ASHA-RAO.pdf`.
pub fn generate_filename(doc_type: DocType, invoice_no: &str, customer_name: &str) -> String {
    let cleaned = NON_ALNUM.replace_all(customer_name, "-").to_uppercase();
    format!(
        "{}-{}-{}.pdf",
        doc_type.file_prefix(),
        invoice_no.trim(),
        cleaned.trim_matches('-')
    )
}

/// Short content hash printed on saved documents and looked up on verification.
///
/// SHA-256 over the `||`-joined parts, truncated to 16 hex characters.
pub fn doc_hash<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join("||");
    let digest = Sha256::digest(joined.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_upper_dashed() {
        assert_eq!(
            generate_filename(DocType::Invoice, " PUN-240101-001 ", "Asha  Rao."),
            "IN-PUN-240101-001-ASHA--RAO.pdf"
        );
        assert_eq!(
            generate_filename(DocType::DuplicateInvoice, "MUM-240102-004", "Mr. D'Souza"),
            "DUP-MUM-240102-004-MR--D-SOUZA.pdf"
        );
    }

    #[test]
    fn doc_type_labels_round_trip() {
        for doc in [
            DocType::Invoice,
            DocType::NurseAgreement,
            DocType::PatientAgreement,
            DocType::DuplicateInvoice,
        ] {
            assert_eq!(DocType::from_label(doc.label()), Some(doc));
        }
        assert_eq!(DocType::from_label("memo"), None);
    }

    #[test]
    fn hash_is_stable_and_short() {
        let a = doc_hash(&["Nurse", "PUN-240101-001", "Asha Rao"]);
        let b = doc_hash(&["Nurse", "PUN-240101-001", "Asha Rao"]);
        let c = doc_hash(&["Nurse", "PUN-240101-002", "Asha Rao"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
        // sha256("") = e3b0c442...
        assert_eq!(doc_hash::<&str>(&[]), "e3b0c44298fc1c14");
    }
}
