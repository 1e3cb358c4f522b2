use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{LedgerError, Result};
use crate::record::LedgerRecord;

/// Write a gzip-compressed bincode backup of `records` to `path`.
///
/// # Arguments
/// * `records` - Ledger rows, in append order
/// * `path` - Destination file, overwritten if present
///
/// # Examples
/// ```
/// use invoice_ledger::record::LedgerRecord;
/// use invoice_ledger::snapshot::{load_snapshot, save_snapshot};
///
/// let dir = std::env::temp_dir().join("ledger-snapshot-doc.bin.gz");
/// save_snapshot(&[LedgerRecord::default()], &dir).unwrap();
/// assert_eq!(load_snapshot(&dir).unwrap().len(), 1);
/// ```
pub fn save_snapshot(records: &[LedgerRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, records)?;
    let encoder = writer
        .into_inner()
        .map_err(|e| LedgerError::Io(e.into_error()))?;
    encoder.finish()?;

    info!("saved {} ledger rows to {}", records.len(), path.display());
    Ok(())
}

/// Read a backup written by [`save_snapshot`].
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Vec<LedgerRecord>> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(GzDecoder::new(file));
    let records: Vec<LedgerRecord> = deserialize_from(&mut reader)?;
    Ok(records)
}

/// In-memory form of [`save_snapshot`], served by the download route.
pub fn to_bytes(records: &[LedgerRecord]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serialize_into(&mut encoder, records)?;
    Ok(encoder.finish()?)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Vec<LedgerRecord>> {
    Ok(deserialize_from(GzDecoder::new(bytes))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Vec<LedgerRecord> {
        vec![
            LedgerRecord {
                uid: "0001".to_string(),
                identifier: "PUN-240101-001".to_string(),
                reference_key: "12-1".to_string(),
                amount: 12600.0,
                ..LedgerRecord::default()
            },
            LedgerRecord {
                uid: "0002".to_string(),
                identifier: "MUM-240101-001".to_string(),
                service_ended: "2024-02-01 10:00:00".to_string(),
                ..LedgerRecord::default()
            },
        ]
    }

    #[test]
    fn file_backup_restores_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin.gz");
        save_snapshot(&ledger(), &path).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), ledger());
    }

    #[test]
    fn garbage_is_a_snapshot_error() {
        let err = from_bytes(b"not a gzip stream").unwrap_err();
        assert!(matches!(err, LedgerError::Snapshot(_)));
    }

    #[test]
    fn missing_file_is_io() {
        let err = load_snapshot("/definitely/not/here.bin.gz").unwrap_err();
        assert!(matches!(err, LedgerError::Io(_)));
    }

    #[test]
    fn bytes_are_compressed() {
        let bytes = to_bytes(&ledger()).unwrap();
        // gzip magic
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert_eq!(from_bytes(&bytes).unwrap().len(), 2);
    }
}
