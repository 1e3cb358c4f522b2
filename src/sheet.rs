//! Row-oriented access to the spreadsheets the tool writes to.
//!
//! A sheet is an ordered list of data rows under a fixed header row. Stores
//! only offer the three operations the workflows need (read every row, append
//! one, overwrite one in place), mirroring the remote spreadsheet API the
//! ledger lives behind.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{LedgerError, Result};

/// Read-only view of one data row, looked up by header name.
pub struct RowView<'a> {
    headers: &'a [String],
    values: &'a [String],
}

impl<'a> RowView<'a> {
    pub fn new(headers: &'a [String], values: &'a [String]) -> Self {
        RowView { headers, values }
    }

    /// Cell under `header` (trimmed, case-insensitive). Missing columns read as "".
    pub fn get(&self, header: &str) -> &'a str {
        let wanted = header.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted))
            .and_then(|i| self.values.get(i))
            .map(|v| v.as_str())
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v.trim().is_empty())
    }
}

/// A record type that maps onto one spreadsheet row.
pub trait SheetRow: Sized {
    /// Sheet name, used in log lines.
    const SHEET: &'static str;

    fn headers() -> &'static [&'static str];

    fn to_row(&self) -> Vec<String>;

    fn from_row(row: &RowView<'_>) -> Self;
}

/// Row-oriented read / append / update API over one sheet.
pub trait SheetStore<R: SheetRow> {
    /// Every data row, in append order.
    fn read_all(&self) -> Result<Vec<R>>;

    fn append(&mut self, row: &R) -> Result<()>;

    /// Overwrite data row `index` (0-based, header excluded).
    fn update(&mut self, index: usize, row: &R) -> Result<()>;
}

/// In-memory sheet for tests and dry runs.
#[derive(Debug, Clone)]
pub struct MemorySheet<R> {
    rows: Vec<R>,
}

impl<R> MemorySheet<R> {
    pub fn new() -> Self {
        MemorySheet { rows: Vec::new() }
    }

    pub fn with_rows(rows: Vec<R>) -> Self {
        MemorySheet { rows }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }
}

impl<R> Default for MemorySheet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SheetRow + Clone> SheetStore<R> for MemorySheet<R> {
    fn read_all(&self) -> Result<Vec<R>> {
        Ok(self.rows.clone())
    }

    fn append(&mut self, row: &R) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn update(&mut self, index: usize, row: &R) -> Result<()> {
        let len = self.rows.len();
        let slot = self
            .rows
            .get_mut(index)
            .ok_or(LedgerError::RowNotFound { index, len })?;
        *slot = row.clone();
        Ok(())
    }
}

/// Sheet persisted as a CSV file with a header row.
///
/// A missing file is an empty sheet; it is created with the header row on the
/// first append.
pub struct CsvSheet<R> {
    path: PathBuf,
    _row: PhantomData<R>,
}

impl<R: SheetRow> CsvSheet<R> {
    pub fn new(path: impl AsRef<Path>) -> Self {
        CsvSheet {
            path: path.as_ref().to_path_buf(),
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<Option<(Vec<String>, Vec<Vec<String>>)>> {
        let mut content = String::new();
        match File::open(&self.path) {
            Ok(mut file) => {
                file.read_to_string(&mut content)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut records = parse_csv(&content)?.into_iter();
        let Some(headers) = records.next() else {
            return Ok(None);
        };
        Ok(Some((headers, records.collect())))
    }

    fn write_table(&self, rows: &[Vec<String>]) -> Result<()> {
        let mut out = csv_line(R::headers().iter().map(|h| h.to_string()));
        for row in rows {
            out.push_str(&csv_line(row.iter().cloned()));
        }
        let mut file = File::create(&self.path)?;
        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

impl<R: SheetRow> SheetStore<R> for CsvSheet<R> {
    fn read_all(&self) -> Result<Vec<R>> {
        let Some((headers, rows)) = self.read_table()? else {
            debug!("{}: {} not found, treating as empty", R::SHEET, self.path.display());
            return Ok(Vec::new());
        };

        let records: Vec<R> = rows
            .iter()
            .map(|values| RowView::new(&headers, values))
            .filter(|view| !view.is_blank())
            .map(|view| R::from_row(&view))
            .collect();
        debug!("{}: read {} rows from {}", R::SHEET, records.len(), self.path.display());
        Ok(records)
    }

    fn append(&mut self, row: &R) -> Result<()> {
        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if needs_header {
            file.write_all(csv_line(R::headers().iter().map(|h| h.to_string())).as_bytes())?;
        }
        file.write_all(csv_line(row.to_row()).as_bytes())?;
        info!("{}: appended row to {}", R::SHEET, self.path.display());
        Ok(())
    }

    fn update(&mut self, index: usize, row: &R) -> Result<()> {
        // Rows are re-serialized through R so a header change on disk is healed.
        let mut rows: Vec<Vec<String>> = self.read_all()?.iter().map(R::to_row).collect();
        let len = rows.len();
        let slot = rows
            .get_mut(index)
            .ok_or(LedgerError::RowNotFound { index, len })?;
        *slot = row.to_row();
        self.write_table(&rows)?;
        info!("{}: updated row {} in {}", R::SHEET, index, self.path.display());
        Ok(())
    }
}

/// Read-through cache in front of another store.
///
/// Reads are served from memory for `ttl`; every write goes straight to the
/// inner store and drops the cached copy.
pub struct CachedSheet<S, R> {
    inner: S,
    ttl: Duration,
    cache: Mutex<Option<(Instant, Vec<R>)>>,
}

impl<S, R> CachedSheet<S, R>
where
    S: SheetStore<R>,
    R: SheetRow + Clone,
{
    pub fn new(inner: S, ttl: Duration) -> Self {
        CachedSheet {
            inner,
            ttl,
            cache: Mutex::new(None),
        }
    }

    pub fn invalidate(&self) {
        match self.cache.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl<S, R> SheetStore<R> for CachedSheet<S, R>
where
    S: SheetStore<R>,
    R: SheetRow + Clone,
{
    fn read_all(&self) -> Result<Vec<R>> {
        let mut guard = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("{}: cache lock poisoned, discarding cached rows", R::SHEET);
                let mut guard = poisoned.into_inner();
                *guard = None;
                guard
            }
        };

        if let Some((fetched_at, rows)) = guard.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(rows.clone());
            }
        }

        let rows = self.inner.read_all()?;
        *guard = Some((Instant::now(), rows.clone()));
        Ok(rows)
    }

    fn append(&mut self, row: &R) -> Result<()> {
        self.invalidate();
        self.inner.append(row)
    }

    fn update(&mut self, index: usize, row: &R) -> Result<()> {
        self.invalidate();
        self.inner.update(index, row)
    }
}

/// Serialize one CSV record, quoting fields that need it.
pub fn csv_line<I>(fields: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut line = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
        {
            line.push('"');
            line.push_str(&field.replace('"', "\"\""));
            line.push('"');
        } else {
            line.push_str(&field);
        }
    }
    line.push('\n');
    line
}

/// Split CSV text into records. Quoted fields may span lines.
pub fn parse_csv(content: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                record.push(std::mem::take(&mut field));
            }
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            '\n' => {
                field.push(c);
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(LedgerError::Csv {
            line,
            detail: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Pair {
        key: String,
        value: String,
    }

    impl SheetRow for Pair {
        const SHEET: &'static str = "Pairs";

        fn headers() -> &'static [&'static str] {
            &["Key", "Value"]
        }

        fn to_row(&self) -> Vec<String> {
            vec![self.key.clone(), self.value.clone()]
        }

        fn from_row(row: &RowView<'_>) -> Self {
            Pair {
                key: row.get("Key").to_string(),
                value: row.get("Value").to_string(),
            }
        }
    }

    fn pair(key: &str, value: &str) -> Pair {
        Pair {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn parse_handles_quotes_and_embedded_newlines() {
        let rows = parse_csv("a,\"b,c\",\"say \"\"hi\"\"\"\n\"multi\nline\",x,\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b,c", "say \"hi\""]);
        assert_eq!(rows[1], vec!["multi\nline", "x", ""]);
    }

    #[test]
    fn parse_rejects_unterminated_quote() {
        let err = parse_csv("a,\"open\nstill open").unwrap_err();
        assert!(matches!(err, LedgerError::Csv { line: 2, .. }));
    }

    #[test]
    fn csv_line_quotes_only_when_needed() {
        let line = csv_line(vec!["plain".to_string(), "a,b".to_string(), "q\"".to_string()]);
        assert_eq!(line, "plain,\"a,b\",\"q\"\"\"\n");
    }

    #[test]
    fn row_view_lookup_is_case_insensitive() {
        let headers = vec![" Key ".to_string(), "VALUE".to_string()];
        let values = vec!["k".to_string()];
        let view = RowView::new(&headers, &values);
        assert_eq!(view.get("key"), "k");
        assert_eq!(view.get("Value"), "");
        assert_eq!(view.get("Missing"), "");
    }

    #[test]
    fn memory_sheet_update_out_of_range() {
        let mut sheet = MemorySheet::with_rows(vec![pair("a", "1")]);
        sheet.update(0, &pair("a", "2")).unwrap();
        assert_eq!(sheet.rows()[0].value, "2");
        let err = sheet.update(3, &pair("b", "1")).unwrap_err();
        assert!(matches!(err, LedgerError::RowNotFound { index: 3, len: 1 }));
    }

    #[test]
    fn csv_sheet_creates_header_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        let mut sheet: CsvSheet<Pair> = CsvSheet::new(&path);

        assert!(sheet.read_all().unwrap().is_empty());
        sheet.append(&pair("a", "x,y")).unwrap();
        sheet.append(&pair("b", "2")).unwrap();
        sheet.update(1, &pair("b", "3")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Key,Value\n"));
        assert_eq!(sheet.read_all().unwrap(), vec![pair("a", "x,y"), pair("b", "3")]);
    }

    #[test]
    fn cached_sheet_serves_stale_reads_until_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.csv");
        let mut cached: CachedSheet<_, Pair> =
            CachedSheet::new(CsvSheet::<Pair>::new(&path), Duration::from_secs(60));

        cached.append(&pair("a", "1")).unwrap();
        assert_eq!(cached.read_all().unwrap().len(), 1);

        // Out-of-band write is invisible while the cache is warm
        let mut direct: CsvSheet<Pair> = CsvSheet::new(&path);
        direct.append(&pair("b", "2")).unwrap();
        assert_eq!(cached.read_all().unwrap().len(), 1);

        cached.invalidate();
        assert_eq!(cached.read_all().unwrap().len(), 2);
    }

    #[test]
    fn zero_ttl_always_reads_through() {
        let mut cached: CachedSheet<_, Pair> = CachedSheet::new(MemorySheet::new(), Duration::ZERO);
        cached.append(&pair("a", "1")).unwrap();
        assert_eq!(cached.read_all().unwrap().len(), 1);
    }
}
