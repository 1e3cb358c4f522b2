//! Sequential invoice numbers and ledger UIDs.
//!
//! Invoice numbers are `LOC-YYMMDD-NNN`: the partition key (office code and
//! issue date, with a trailing dash) followed by a 3-digit sequence that
//! restarts at 1 in every partition. UIDs are a separate 4-digit counter over
//! the whole ledger.
//!
//! Both allocators are pure functions over an already-fetched ledger. A row
//! whose number cannot be parsed is skipped, never treated as an error.
//! Allocation is read-then-append with no lock or conditional write, so two
//! staff members issuing in the same partition at the same moment can be
//! handed the same number.

use std::fmt;

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_id;
use crate::record::LedgerRecord;

/// Width of the per-partition sequence.
pub const SEQUENCE_WIDTH: usize = 3;

/// Width of the global UID counter.
pub const UID_WIDTH: usize = 4;

/// Office the engagement is billed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Pune,
    Mumbai,
    Kolhapur,
}

impl Location {
    /// Infer the office from a free-text address or city field.
    ///
    /// Anything that does not mention Mumbai or Kolhapur is billed from Pune.
    pub fn infer(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("mumbai") {
            Location::Mumbai
        } else if lower.contains("kolhapur") {
            Location::Kolhapur
        } else {
            Location::Pune
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Location::Pune => "PUN",
            Location::Mumbai => "MUM",
            Location::Kolhapur => "KOP",
        }
    }

    /// City name; [`Location::infer`] maps it back to the same office.
    pub fn city(self) -> &'static str {
        match self {
            Location::Pune => "Pune",
            Location::Mumbai => "Mumbai",
            Location::Kolhapur => "Kolhapur",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "PUN" => Some(Location::Pune),
            "MUM" => Some(Location::Mumbai),
            "KOP" => Some(Location::Kolhapur),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Bucket that sequence numbers restart in: one office on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub location: Location,
    pub date: NaiveDate,
}

impl PartitionKey {
    pub fn new(location: Location, date: NaiveDate) -> Self {
        PartitionKey { location, date }
    }
}

impl fmt::Display for PartitionKey {
    /// `PUN-240101-`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-", self.location.code(), self.date.format("%y%m%d"))
    }
}

/// An invoice number split into its partition prefix and sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId {
    pub prefix: String,
    pub sequence: u64,
}

impl InvoiceId {
    /// Parse `raw` as a number in the partition `prefix`.
    ///
    /// Returns `None` when `raw` belongs to another partition or its last
    /// dash-separated segment is not a number.
    pub fn parse(raw: &str, prefix: &str) -> Option<Self> {
        let raw = raw.trim();
        if !raw.starts_with(prefix) {
            return None;
        }
        let suffix = raw.rsplit('-').next()?;
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let sequence = suffix.parse().ok()?;
        Some(InvoiceId {
            prefix: prefix.to_string(),
            sequence,
        })
    }

    pub fn first(prefix: &str) -> Self {
        InvoiceId {
            prefix: prefix.to_string(),
            sequence: 1,
        }
    }

    /// The following number, `None` once the sequence is exhausted.
    pub fn next(&self) -> Option<Self> {
        Some(InvoiceId {
            prefix: self.prefix.clone(),
            sequence: self.sequence.checked_add(1)?,
        })
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}", self.prefix, self.sequence, width = SEQUENCE_WIDTH)
    }
}

/// Highest sequence already used under `prefix`, if any.
///
/// A sequence with no successor cannot be allocated after and is skipped.
fn max_sequence(prefix: &str, ledger: &[LedgerRecord]) -> Option<InvoiceId> {
    let mut best: Option<InvoiceId> = None;
    for record in ledger {
        let raw = normalize_id(&record.identifier);
        if !raw.starts_with(prefix) {
            continue;
        }
        match InvoiceId::parse(&raw, prefix) {
            Some(id) if id.sequence == u64::MAX => {
                warn!("skipping exhausted invoice number '{}'", raw)
            }
            Some(id) if best.as_ref().is_none_or(|b| id.sequence > b.sequence) => best = Some(id),
            Some(_) => {}
            None => warn!("skipping malformed invoice number '{}'", raw),
        }
    }
    best
}

/// Next invoice number in the partition whose string prefix is `partition_key`.
///
/// # Examples
/// ```
/// use invoice_ledger::identifier::next_identifier;
///
/// assert_eq!(next_identifier("PUN-240101-", &[]), "PUN-240101-001");
/// ```
pub fn next_identifier(partition_key: &str, ledger: &[LedgerRecord]) -> String {
    allocate_in(partition_key, ledger).to_string()
}

/// Typed form of [`next_identifier`].
pub fn allocate(partition: &PartitionKey, ledger: &[LedgerRecord]) -> InvoiceId {
    allocate_in(&partition.to_string(), ledger)
}

fn allocate_in(prefix: &str, ledger: &[LedgerRecord]) -> InvoiceId {
    let id = max_sequence(prefix, ledger)
        .and_then(|last| last.next())
        .unwrap_or_else(|| InvoiceId::first(prefix));
    debug!("allocated {} from {} ledger rows", id, ledger.len());
    id
}

/// Next ledger UID, `0001` on an empty ledger.
pub fn next_uid(ledger: &[LedgerRecord]) -> String {
    let next = ledger
        .iter()
        .filter_map(|record| {
            let raw = normalize_id(&record.uid);
            if raw.is_empty() {
                return None;
            }
            match raw.parse::<u64>() {
                Ok(n) => n.checked_add(1).or_else(|| {
                    warn!("skipping exhausted UID '{}'", raw);
                    None
                }),
                Err(_) => {
                    warn!("skipping malformed UID '{}'", raw);
                    None
                }
            }
        })
        .max()
        .unwrap_or(1);
    format!("{:0width$}", next, width = UID_WIDTH)
}
