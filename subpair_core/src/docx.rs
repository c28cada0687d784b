//! Minimal WordprocessingML package holding a single table.
//!
//! Only what the tabular document needs is written: content types, the
//! package relationship, and `word/document.xml` with one bordered table.
//! Reading accepts any Word document and returns the text of every
//! top-level table, cell by cell.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use subpair_common::SubpairError;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Fill colour of highlighted (marker) cells
pub const HIGHLIGHT_FILL: &str = "CCFFCC";

const DOCUMENT_PART: &str = "word/document.xml";
const CELL_WIDTH: u32 = 4675;

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#,
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#,
);

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a Word document: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Missing document part: {0}")]
    MissingPart(&'static str),
}

impl From<DocxError> for SubpairError {
    fn from(err: DocxError) -> Self {
        match err {
            DocxError::Io(e) => SubpairError::Io(e),
            other => SubpairError::Document(other.to_string()),
        }
    }
}

/// One table row as plain cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    /// First cell is bold and shaded with [`HIGHLIGHT_FILL`]
    pub highlighted: bool,
}

impl TableRow {
    pub fn plain(cells: Vec<String>) -> Self {
        Self {
            cells,
            highlighted: false,
        }
    }

    pub fn highlighted(cells: Vec<String>) -> Self {
        Self {
            cells,
            highlighted: true,
        }
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Write a document whose body is a single table with `columns` columns
pub fn write_table<W: Write + Seek>(
    writer: W,
    columns: usize,
    rows: &[TableRow],
) -> Result<W, DocxError> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(PACKAGE_RELS.as_bytes())?;

    zip.start_file(DOCUMENT_PART, options)?;
    zip.write_all(document_xml(columns, rows).as_bytes())?;

    Ok(zip.finish()?)
}

pub fn save_table(path: &Path, columns: usize, rows: &[TableRow]) -> Result<(), DocxError> {
    let file = File::create(path)?;
    let mut file = write_table(file, columns, rows)?;
    file.flush()?;
    Ok(())
}

fn document_xml(columns: usize, rows: &[TableRow]) -> String {
    let mut xml = String::with_capacity(512 + rows.len() * 256);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    );

    xml.push_str(r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblBorders>"#);
    for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        xml.push_str(&format!(
            r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#
        ));
    }
    xml.push_str(r#"</w:tblBorders></w:tblPr><w:tblGrid>"#);
    for _ in 0..columns {
        xml.push_str(&format!(r#"<w:gridCol w:w="{CELL_WIDTH}"/>"#));
    }
    xml.push_str("</w:tblGrid>");

    for row in rows {
        xml.push_str("<w:tr>");
        for col in 0..columns {
            let highlight = row.highlighted && col == 0;
            push_cell(&mut xml, row.cell(col), highlight);
        }
        xml.push_str("</w:tr>");
    }

    // Word expects a paragraph between a trailing table and the section properties
    xml.push_str("</w:tbl><w:p/>");
    xml.push_str(r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#);
    xml.push_str("</w:body></w:document>");
    xml
}

fn push_cell(xml: &mut String, text: &str, highlight: bool) {
    xml.push_str(&format!(
        r#"<w:tc><w:tcPr><w:tcW w:w="{CELL_WIDTH}" w:type="dxa"/>"#
    ));
    if highlight {
        xml.push_str(&format!(
            r#"<w:shd w:val="clear" w:color="auto" w:fill="{HIGHLIGHT_FILL}"/>"#
        ));
    }
    xml.push_str("</w:tcPr><w:p>");

    if !text.is_empty() {
        xml.push_str("<w:r>");
        if highlight {
            xml.push_str("<w:rPr><w:b/></w:rPr>");
        }
        push_run_text(xml, text);
        xml.push_str("</w:r>");
    }

    xml.push_str("</w:p></w:tc>");
}

/// Tabs and line breaks become run elements; everything else goes into `w:t`
fn push_run_text(xml: &mut String, text: &str) {
    let mut segment = String::new();
    for ch in text.chars() {
        match ch {
            '\t' | '\n' => {
                flush_segment(xml, &mut segment);
                xml.push_str(if ch == '\t' { "<w:tab/>" } else { "<w:br/>" });
            }
            c if is_xml_char(c) => segment.push(c),
            _ => segment.push(char::REPLACEMENT_CHARACTER),
        }
    }
    flush_segment(xml, &mut segment);
}

fn flush_segment(xml: &mut String, segment: &mut String) {
    if segment.is_empty() {
        return;
    }
    xml.push_str(r#"<w:t xml:space="preserve">"#);
    xml.push_str(&quick_xml::escape::escape(segment.as_str()));
    xml.push_str("</w:t>");
    segment.clear();
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Text of every top-level table in the document, in document order
pub fn read_tables<R: Read + Seek>(reader: R) -> Result<Vec<Vec<TableRow>>, DocxError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DocxError::MissingPart(DOCUMENT_PART));
        }
        Err(e) => return Err(e.into()),
    }

    parse_tables(&xml)
}

pub fn load_tables(path: &Path) -> Result<Vec<Vec<TableRow>>, DocxError> {
    read_tables(File::open(path)?)
}

#[derive(Default)]
struct CellText {
    paragraphs: Vec<String>,
    shaded: bool,
}

impl CellText {
    fn push_str(&mut self, text: &str) {
        match self.paragraphs.last_mut() {
            Some(last) => last.push_str(text),
            None => self.paragraphs.push(text.to_string()),
        }
    }
}

fn parse_tables(xml: &str) -> Result<Vec<Vec<TableRow>>, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut tables: Vec<Vec<TableRow>> = Vec::new();
    let mut depth = 0usize;
    let mut row: Option<TableRow> = None;
    let mut cell: Option<CellText> = None;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"tbl" => {
                    depth += 1;
                    if depth == 1 {
                        tables.push(Vec::new());
                    }
                }
                b"tr" if depth == 1 => row = Some(TableRow::default()),
                b"tc" if depth == 1 => cell = Some(CellText::default()),
                b"p" if depth == 1 => {
                    if let Some(cell) = cell.as_mut() {
                        cell.paragraphs.push(String::new());
                    }
                }
                b"r" if depth == 1 => in_run = true,
                b"t" if depth == 1 && in_run => in_text = true,
                b"shd" if depth == 1 => mark_shading(e, cell.as_mut()),
                _ => {}
            },
            Event::Empty(ref e) if depth == 1 => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(cell) = cell.as_mut() {
                        cell.paragraphs.push(String::new());
                    }
                }
                b"shd" => mark_shading(e, cell.as_mut()),
                b"tab" if in_run => {
                    if let Some(cell) = cell.as_mut() {
                        cell.push_str("\t");
                    }
                }
                b"br" | b"cr" if in_run => {
                    if let Some(cell) = cell.as_mut() {
                        cell.push_str("\n");
                    }
                }
                _ => {}
            },
            Event::Text(ref t) if in_text => {
                if let Some(cell) = cell.as_mut() {
                    cell.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref c) if in_text => {
                if let Some(cell) = cell.as_mut() {
                    cell.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"tbl" => depth = depth.saturating_sub(1),
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"tc" if depth == 1 => {
                    if let (Some(done), Some(row)) = (cell.take(), row.as_mut()) {
                        if row.cells.is_empty() && done.shaded {
                            row.highlighted = true;
                        }
                        row.cells.push(done.paragraphs.join("\n"));
                    }
                }
                b"tr" if depth == 1 => {
                    if let (Some(done), Some(table)) = (row.take(), tables.last_mut()) {
                        table.push(done);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tables)
}

fn mark_shading(element: &BytesStart<'_>, cell: Option<&mut CellText>) {
    let Some(cell) = cell else {
        return;
    };
    let highlighted = element.attributes().flatten().any(|attr| {
        attr.key.local_name().as_ref() == b"fill"
            && attr.value.eq_ignore_ascii_case(HIGHLIGHT_FILL.as_bytes())
    });
    if highlighted {
        cell.shaded = true;
    }
}
