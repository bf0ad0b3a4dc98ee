//! Delimited reference-table reader.
//!
//! Reference exports arrive as `;`- or `,`-delimited text, sometimes gzip
//! compressed, sometimes with a UTF-8 byte-order mark. [`read_table`] hides
//! those differences and yields a header-indexed [`Table`] of trimmed cells.

use std::io::Read as _;
use std::path::Path;

use crate::ReferenceError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A fully materialized delimited table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Trimmed header names, in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first header matching any of `names` exactly.
    ///
    /// Candidates are tried in order, so `&["code_parametre", "Code_parametre"]`
    /// prefers the lower-case spelling when both are present.
    #[must_use]
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|name| self.headers.iter().position(|h| h == name))
    }

    /// Index of the first header satisfying `predicate` (given the
    /// lower-cased header).
    #[must_use]
    pub fn find_column(&self, predicate: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| predicate(&h.to_lowercase()))
    }

    /// Iterates data rows.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row {
            headers: &self.headers,
            values,
        })
    }
}

/// One data row borrowed from a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    headers: &'a [String],
    values: &'a [String],
}

impl<'a> Row<'a> {
    /// Non-empty cell at `index`. Short rows read as empty.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.values
            .get(index)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Non-empty cell at an optional column index.
    #[must_use]
    pub fn get_opt(&self, index: Option<usize>) -> Option<&'a str> {
        index.and_then(|i| self.get(i))
    }

    /// `(header, value)` pairs for every non-empty cell.
    pub fn cells(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .filter(|(h, v)| !h.is_empty() && !v.is_empty())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

/// Picks the delimiter for a header line: `;` unless commas outnumber
/// semicolons.
#[must_use]
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if commas > semicolons { b',' } else { b';' }
}

/// Reads a delimited table from disk, decompressing `.gz` files.
///
/// # Errors
///
/// * [`ReferenceError::Io`] if the file cannot be read or decompressed
/// * [`ReferenceError::Csv`] if the content is not valid delimited text
pub fn read_table(path: &Path) -> Result<Table, ReferenceError> {
    let raw = std::fs::read(path)?;

    let bytes = if path.extension().is_some_and(|ext| ext == "gz") {
        let mut decoder = flate2::read::GzDecoder::new(raw.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        log::debug!(
            "Decompressed {} to {} bytes",
            path.display(),
            decompressed.len()
        );
        decompressed
    } else {
        raw
    };

    parse_table(&bytes)
}

/// Parses delimited text, sniffing the delimiter from the header line.
///
/// An empty input yields an empty table with no headers.
///
/// # Errors
///
/// Returns [`ReferenceError::Csv`] if a record cannot be decoded.
pub fn parse_table(bytes: &[u8]) -> Result<Table, ReferenceError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let header_end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(bytes.len());
    let header_line = String::from_utf8_lossy(&bytes[..header_end]);
    let delimiter = sniff_delimiter(&header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|v| v.trim().to_owned()).collect());
    }

    Ok(Table { headers, rows })
}
