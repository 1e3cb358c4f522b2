//! Detection of clients that already have an open engagement.
//!
//! The check is advisory: it runs over a ledger snapshot and reports what it
//! finds. Nothing stops two writers from both seeing "no active record" and
//! appending.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::record::{LedgerRecord, normalize_reference_key};

/// What the caller wants to happen when an active record already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Refuse to issue.
    #[default]
    Block,
    /// Rewrite the active row in place, keeping its invoice number, UID,
    /// date and location.
    Overwrite,
    /// Issue a fresh number regardless.
    ForceNew,
}

fn matching<'a>(
    reference_key: &'a str,
    ledger: &'a [LedgerRecord],
) -> impl DoubleEndedIterator<Item = (usize, &'a LedgerRecord)> + 'a {
    let wanted = normalize_reference_key(reference_key);
    ledger
        .iter()
        .enumerate()
        .filter(move |(_, r)| normalize_reference_key(&r.reference_key) == wanted)
}

/// Most recently appended record for the client whose `Service Ended` is blank.
pub fn find_active_record<'a>(
    reference_key: &str,
    ledger: &'a [LedgerRecord],
) -> Option<&'a LedgerRecord> {
    find_active_index(reference_key, ledger).map(|i| &ledger[i])
}

/// Row position of [`find_active_record`]'s result, for in-place updates.
pub fn find_active_index(reference_key: &str, ledger: &[LedgerRecord]) -> Option<usize> {
    let found = matching(reference_key, ledger)
        .rev()
        .find(|(_, r)| r.is_active())
        .map(|(i, _)| i);
    debug!("active lookup for '{}': {:?}", reference_key.trim(), found);
    found
}

/// Whether the client's latest engagement has been closed.
///
/// Only the most recent record for the client is consulted. A client with no
/// records at all is new, not ended.
pub fn is_service_ended(reference_key: &str, ledger: &[LedgerRecord]) -> bool {
    matching(reference_key, ledger)
        .next_back()
        .is_some_and(|(_, r)| !r.is_active())
}

/// Reference keys seen in a ledger, split by whether their row is closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExclusionLists {
    pub present: Vec<String>,
    pub ended: Vec<String>,
}

impl ExclusionLists {
    pub fn scan(ledger: &[LedgerRecord]) -> Self {
        let mut lists = ExclusionLists::default();
        for record in ledger {
            let key = normalize_reference_key(&record.reference_key);
            if key.is_empty() {
                continue;
            }
            if !record.is_active() {
                lists.ended.push(key.clone());
            }
            lists.present.push(key);
        }
        lists
    }
}

/// Clients partitioned for the picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSplit<T> {
    /// New clients and clients with an ongoing engagement.
    pub standard: Vec<T>,
    /// Clients whose latest engagement ended; only a forced new engagement applies.
    pub ended: Vec<T>,
}

/// Split `clients` by [`is_service_ended`] on the key `key_of` extracts.
pub fn split_clients<T, F>(clients: Vec<T>, ledger: &[LedgerRecord], key_of: F) -> ClientSplit<T>
where
    F: Fn(&T) -> String,
{
    let (ended, standard): (Vec<T>, Vec<T>) = clients
        .into_iter()
        .partition(|c| is_service_ended(&key_of(c), ledger));
    ClientSplit { standard, ended }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reference_key: &str, identifier: &str, service_ended: &str) -> LedgerRecord {
        LedgerRecord {
            reference_key: reference_key.to_string(),
            identifier: identifier.to_string(),
            service_ended: service_ended.to_string(),
            ..LedgerRecord::default()
        }
    }

    #[test]
    fn active_record_after_an_ended_one() {
        let ledger = vec![
            row("REF1", "PUN-240101-001", "2024-01-20 10:00:00"),
            row("REF1", "PUN-240201-001", ""),
        ];
        let active = find_active_record("REF1", &ledger).unwrap();
        assert_eq!(active.identifier, "PUN-240201-001");
        assert!(!is_service_ended("REF1", &ledger));
    }

    #[test]
    fn all_ended_means_none_active() {
        let ledger = vec![
            row("REF1", "PUN-240101-001", "2024-01-20 10:00:00"),
            row("REF1", "PUN-240201-001", "2024-02-20 10:00:00"),
        ];
        assert!(find_active_record("REF1", &ledger).is_none());
        assert!(is_service_ended("REF1", &ledger));
    }

    #[test]
    fn unknown_client_is_new() {
        let ledger = vec![row("REF1", "PUN-240101-001", "")];
        assert!(find_active_record("REF2", &ledger).is_none());
        assert!(!is_service_ended("REF2", &ledger));
        assert!(!is_service_ended("", &[]));
    }

    #[test]
    fn last_of_several_active_rows_wins() {
        let ledger = vec![
            row(" REF1", "PUN-240101-001", ""),
            row("REF9", "PUN-240101-002", ""),
            row("REF1 ", "PUN-240101-003", " "),
        ];
        assert_eq!(find_active_index("REF1", &ledger), Some(2));
        assert_eq!(find_active_record(" REF1 ", &ledger).unwrap().identifier, "PUN-240101-003");
    }

    #[test]
    fn float_typed_keys_match_their_integer_form() {
        let ledger = vec![
            row("7.0", "PUN-240101-001", ""),
            row("12.0-1.0", "PUN-240101-002", "2024-01-20 10:00:00"),
        ];
        assert_eq!(find_active_record("7", &ledger).unwrap().identifier, "PUN-240101-001");
        assert_eq!(find_active_index(" 7 ", &ledger), Some(0));
        assert!(!is_service_ended("7", &ledger));
        assert!(is_service_ended("12-1", &ledger));
        assert!(find_active_record("12-1", &ledger).is_none());

        let lists = ExclusionLists::scan(&ledger);
        assert_eq!(lists.present, vec!["7", "12-1"]);
        assert_eq!(lists.ended, vec!["12-1"]);
    }

    #[test]
    fn only_latest_row_decides_ended() {
        // Older row ended, newer row reopened
        let reopened = vec![row("R", "a", "x"), row("R", "b", "")];
        assert!(!is_service_ended("R", &reopened));
        // Older row active, newer row ended
        let closed = vec![row("R", "a", ""), row("R", "b", "x")];
        assert!(is_service_ended("R", &closed));
    }

    #[test]
    fn exclusion_lists_and_client_split() {
        let ledger = vec![row("A", "1", ""), row("B", "2", "done"), row("", "3", "")];
        let lists = ExclusionLists::scan(&ledger);
        assert_eq!(lists.present, vec!["A", "B"]);
        assert_eq!(lists.ended, vec!["B"]);

        let clients = vec!["A", "B", "C"];
        let split = split_clients(clients, &ledger, |c| c.to_string());
        assert_eq!(split.standard, vec!["A", "C"]);
        assert_eq!(split.ended, vec!["B"]);
    }
}
