//! Row layout of the tabular document.
//!
//! Row 0 declares the file type, each section opens with a highlighted
//! marker row naming the file, and every following row is one line pair.

use crate::docx::TableRow;
use std::fmt;
use subpair_common::{FileKind, FileSection, LinePair, SubpairError, TabularDocument};
use tracing::{debug, warn};

pub const HEADER_PREFIX: &str = "Тип файлов:";
pub const MARKER_PREFIX: &str = "Файл:";
pub const COLUMNS: usize = 2;

/// How section markers were recognized while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerDetection {
    /// Only highlighted rows with the marker prefix start a section
    Structural,
    /// Any row whose first cell starts with the marker prefix starts a section
    Prefix,
}

impl fmt::Display for MarkerDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerDetection::Structural => write!(f, "structural"),
            MarkerDetection::Prefix => write!(f, "prefix"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub document: TabularDocument,
    pub detection: MarkerDetection,
    /// Whether row 0 declared the file type
    pub declared: bool,
}

pub fn header_row(kind: FileKind) -> TableRow {
    TableRow::plain(vec![format!("{} {}", HEADER_PREFIX, kind), String::new()])
}

pub fn marker_row(basename: &str) -> TableRow {
    TableRow::highlighted(vec![format!("{} {}", MARKER_PREFIX, basename), String::new()])
}

pub fn data_row(pair: &LinePair) -> TableRow {
    TableRow::plain(vec![pair.side_a.clone(), pair.side_b.clone()])
}

/// Append a section's marker row and its line pairs
pub fn push_section(rows: &mut Vec<TableRow>, section: &FileSection) {
    rows.reserve(section.pairs.len() + 1);
    rows.push(marker_row(&section.basename));
    rows.extend(section.pairs.iter().map(data_row));
}

pub fn to_rows(document: &TabularDocument) -> Vec<TableRow> {
    let mut rows = Vec::with_capacity(document.row_count());
    rows.push(header_row(document.kind));
    for section in &document.sections {
        push_section(&mut rows, section);
    }
    rows
}

/// Declared type from a header cell; anything but `srt` reads as `txt`
fn parse_header(cell: &str) -> Option<FileKind> {
    let rest = cell.trim().strip_prefix(HEADER_PREFIX)?;
    match rest.trim().to_lowercase().as_str() {
        "srt" => Some(FileKind::Srt),
        _ => Some(FileKind::Txt),
    }
}

fn marker_name(row: &TableRow) -> Option<&str> {
    row.cell(0)
        .trim()
        .strip_prefix(MARKER_PREFIX)
        .map(str::trim)
}

/// Rebuild the document from the text of its tables.
///
/// Rows that precede the first marker are ignored. A repeated marker
/// replaces the content of the earlier section with the same name.
pub fn from_tables(tables: &[Vec<TableRow>]) -> Result<ParsedDocument, SubpairError> {
    if tables.is_empty() {
        return Err(SubpairError::config("No table found in document"));
    }

    let header = tables
        .iter()
        .filter_map(|table| table.first())
        .find_map(|row| parse_header(row.cell(0)));
    let kind = header.unwrap_or_default();

    let detection = if tables
        .iter()
        .flatten()
        .any(|row| row.highlighted && marker_name(row).is_some())
    {
        MarkerDetection::Structural
    } else {
        MarkerDetection::Prefix
    };
    debug!("Document declares {} with {:?} markers", kind, detection);

    let mut document = TabularDocument::new(kind);
    let mut current: Option<usize> = None;
    let mut skipped = 0usize;

    for table in tables {
        for (idx, row) in table.iter().enumerate() {
            if idx == 0 && parse_header(row.cell(0)).is_some() {
                continue;
            }

            let marker = match detection {
                MarkerDetection::Structural if !row.highlighted => None,
                _ => marker_name(row),
            };

            if let Some(name) = marker {
                current = open_section(&mut document, name);
                continue;
            }

            match current {
                Some(index) => document.sections[index]
                    .pairs
                    .push(LinePair::new(row.cell(0), row.cell(1))),
                None => skipped += 1,
            }
        }
    }

    if skipped > 0 {
        debug!("Ignored {} rows outside any file section", skipped);
    }

    Ok(ParsedDocument {
        document,
        detection,
        declared: header.is_some(),
    })
}

fn open_section(document: &mut TabularDocument, name: &str) -> Option<usize> {
    if name.is_empty() {
        warn!("Marker row without a file name, ignoring its rows");
        return None;
    }

    if let Some(index) = document.sections.iter().position(|s| s.basename == name) {
        warn!("Duplicate section for {}, keeping the later one", name);
        document.sections[index].pairs.clear();
        return Some(index);
    }

    debug!("Processing section for {}", name);
    document.sections.push(FileSection::new(name));
    Some(document.sections.len() - 1)
}
