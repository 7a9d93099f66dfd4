//! Delimited-text plumbing shared by the matrix, annotation and gene-list
//! loaders. Delimiter detection and line iteration work on raw bytes; rows are
//! read with `csv` so quoted fields may contain the delimiter.

use memchr::{memchr, memchr_iter};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delimiter {
    Tab,
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Tab => "tab",
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
        }
    }

    /// Tab wins when present at least as often as commas, then semicolon,
    /// then comma; a header with none of them is treated as tab-separated.
    pub fn detect(header: &[u8]) -> Self {
        let tabs = memchr_iter(b'\t', header).count();
        let commas = memchr_iter(b',', header).count();
        if tabs > 0 && tabs >= commas {
            Delimiter::Tab
        } else if memchr(b';', header).is_some() {
            Delimiter::Semicolon
        } else if commas > 0 {
            Delimiter::Comma
        } else {
            Delimiter::Tab
        }
    }
}

/// Iterates `(line_number, line)` pairs; line numbers are 1-based and the
/// line excludes its `\n` / `\r\n` terminator.
pub struct Lines<'a> {
    bytes: &'a [u8],
    pos: usize,
    line_no: usize,
}

impl<'a> Lines<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        Self {
            bytes,
            pos: 0,
            line_no: 0,
        }
    }

    /// Skips blank lines and returns the next line with content.
    pub fn next_non_blank(&mut self) -> Option<(usize, &'a [u8])> {
        self.find(|(_, line)| !is_blank(line))
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let rest = &self.bytes[self.pos..];
        let (line, advance) = match memchr(b'\n', rest) {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        self.line_no += 1;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some((self.line_no, line))
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

/// One data row: the 1-based line it starts on and its trimmed, unquoted fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

/// A row the reader could not decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordError {
    pub line: usize,
    pub reason: String,
}

impl RecordError {
    fn from_csv(e: &csv::Error) -> Self {
        let line = e.position().map_or(0, |p| p.line() as usize);
        let reason = match e.kind() {
            csv::ErrorKind::Utf8 { .. } => "row is not valid UTF-8".to_string(),
            _ => e.to_string(),
        };
        Self { line, reason }
    }
}

/// Quote-aware records over a whole table, header included. Rows may differ
/// in width; the loaders decide what a ragged row means. Rows whose fields are
/// all empty are skipped.
pub struct Records<'a> {
    inner: csv::StringRecordsIntoIter<&'a [u8]>,
}

impl<'a> Records<'a> {
    pub fn new(bytes: &'a [u8], delim: Delimiter) -> Self {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let reader = csv::ReaderBuilder::new()
            .delimiter(delim.as_byte())
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);
        Self {
            inner: reader.into_records(),
        }
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rec = match self.inner.next()? {
                Ok(rec) => rec,
                Err(e) => return Some(Err(RecordError::from_csv(&e))),
            };
            if rec.iter().all(str::is_empty) {
                continue;
            }
            let line = rec.position().map_or(0, |p| p.line() as usize);
            return Some(Ok(Record {
                line,
                fields: rec.iter().map(str::to_string).collect(),
            }));
        }
    }
}

/// First non-blank line, used to pick a delimiter before any field is parsed.
pub fn header_line(bytes: &[u8]) -> Option<&[u8]> {
    Lines::new(bytes).next_non_blank().map(|(_, line)| line)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnRole {
    GeneId,
    Sample,
    Attribute,
}

#[derive(Clone, Debug)]
pub struct Column {
    pub name: String,
    pub role: ColumnRole,
}

/// Column layout of a table, fixed once from its header.
#[derive(Clone, Debug)]
pub struct TableSchema {
    pub delimiter: Delimiter,
    pub columns: Vec<Column>,
    pub id_column: usize,
}

impl TableSchema {
    pub fn new(delimiter: Delimiter, names: &[&str], id_column: usize, other: ColumnRole) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| Column {
                name: (*name).to_string(),
                role: if i == id_column {
                    ColumnRole::GeneId
                } else {
                    other
                },
            })
            .collect();
        Self {
            delimiter,
            columns,
            id_column,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn id_name(&self) -> &str {
        &self.columns[self.id_column].name
    }

    pub fn columns_with_role(&self, role: ColumnRole) -> impl Iterator<Item = (usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.role == role)
            .map(|(i, c)| (i, c.name.as_str()))
    }
}
