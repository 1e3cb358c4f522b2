#![cfg(not(tarpaulin_include))]

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::error::{LedgerError, Result};
use crate::sheet::{SheetRow, csv_line};

impl From<XlsxError> for LedgerError {
    fn from(e: XlsxError) -> Self {
        LedgerError::Export(e.to_string())
    }
}

/// Convert sheet rows to CSV
///
/// The first line is the sheet's header row. Fields containing commas,
/// quotes or newlines are quoted.
///
/// # Arguments
/// * `rows` - Rows to export, in sheet order
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use invoice_ledger::export::to_csv;
/// use invoice_ledger::record::LedgerRecord;
///
/// let csv = to_csv::<LedgerRecord>(&[]);
/// assert!(csv.starts_with("UID,Invoice Number"));
/// ```
pub fn to_csv<R: SheetRow>(rows: &[R]) -> String {
    let mut csv_content = csv_line(R::headers().iter().map(|h| h.to_string()));
    for row in rows {
        csv_content.push_str(&csv_line(row.to_row()));
    }
    csv_content
}

/// Convert sheet rows to an XLSX workbook
///
/// One worksheet named after the sheet, a bold header row, every cell written
/// as text so zero-padded numbers keep their padding.
///
/// # Arguments
/// * `rows` - Rows to export, in sheet order
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content
pub fn to_xlsx<R: SheetRow>(rows: &[R]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(R::SHEET)?;

    let bold = Format::new().set_bold();
    for (c, header) in R::headers().iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, *header, &bold)?;
    }

    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.to_row().iter().enumerate() {
            worksheet.write_string((r + 1) as u32, c as u16, value)?;
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LedgerRecord;

    fn ledger() -> Vec<LedgerRecord> {
        vec![LedgerRecord {
            uid: "0001".to_string(),
            identifier: "PUN-240101-001".to_string(),
            customer_name: "Rao, Asha".to_string(),
            amount: 12600.0,
            ..LedgerRecord::default()
        }]
    }

    #[test]
    fn csv_has_header_and_quoted_rows() {
        let csv = to_csv(&ledger());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("UID,Invoice Number,Ref Key"));
        assert!(lines[1].starts_with("0001,PUN-240101-001,"));
        assert!(lines[1].contains("\"Rao, Asha\""));
        assert!(lines[1].contains(",12600,"));
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&ledger()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
