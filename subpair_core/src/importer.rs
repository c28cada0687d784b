use crate::docx;
use crate::document::{self, MarkerDetection, ParsedDocument};
use crate::encoding::{self, encode_lossy};
use crate::ProgressFn;
use encoding_rs::{Encoding, UTF_8};
use std::fs;
use std::path::{Path, PathBuf};
use subpair_common::{AppConfig, FileKind, SubpairError};
use tracing::{debug, info, warn};

/// Files written for one recovered section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPair {
    pub basename: String,
    pub side_a: PathBuf,
    pub side_b: PathBuf,
    pub lines: usize,
}

/// Result of one import
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub kind: FileKind,
    /// Whether the document declared its file type in row 0
    pub declared: bool,
    pub detection: MarkerDetection,
    pub written: Vec<WrittenPair>,
}

/// Splits a tabular document back into two mirrored file trees
pub struct DocumentImporter {
    legacy_encoding: String,
}

impl DocumentImporter {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            legacy_encoding: config.side_b_encoding.clone(),
        }
    }

    /// Side B output encoding: UTF-8 for subtitles, the legacy encoding for plain text
    pub fn side_b_encoding(&self, kind: FileKind) -> Result<&'static Encoding, SubpairError> {
        match kind {
            FileKind::Srt => Ok(UTF_8),
            FileKind::Txt => encoding::require(&self.legacy_encoding),
        }
    }

    /// Parse a document without writing anything
    pub fn parse(&self, document_path: &Path) -> Result<ParsedDocument, SubpairError> {
        if !document_path.is_file() {
            return Err(SubpairError::not_found(document_path));
        }

        let tables = docx::load_tables(document_path)?;
        document::from_tables(&tables)
    }

    /// Recover every section of `document_path` into `side_a_out` and `side_b_out`.
    ///
    /// Without `overwrite`, occupied output paths get a `_1`, `_2`, ... suffix.
    pub fn import(
        &self,
        document_path: &Path,
        side_a_out: &Path,
        side_b_out: &Path,
        overwrite: bool,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<ImportSummary, SubpairError> {
        let parsed = self.parse(document_path)?;
        let kind = parsed.document.kind;
        if !parsed.declared {
            warn!("{} has no file type header, writing .{} files", document_path.display(), kind);
        }
        if parsed.detection == MarkerDetection::Prefix {
            warn!("No highlighted markers in {}, splitting on the marker prefix", document_path.display());
        }
        let b_encoding = self.side_b_encoding(kind)?;

        let names = parsed
            .document
            .sections
            .iter()
            .map(|s| output_file_name(&s.basename, kind))
            .collect::<Result<Vec<_>, _>>()?;

        fs::create_dir_all(side_a_out)?;
        fs::create_dir_all(side_b_out)?;

        let total = parsed.document.sections.len();
        let mut written = Vec::with_capacity(total);

        for (idx, (section, file_name)) in parsed.document.sections.iter().zip(&names).enumerate() {
            let mut a_path = side_a_out.join(file_name);
            let mut b_path = side_b_out.join(file_name);
            if !overwrite {
                a_path = unique_path(&a_path);
                b_path = unique_path(&b_path);
            }

            fs::write(&a_path, encode_lossy(&join_lines(section.side_a_lines()), UTF_8))?;
            fs::write(&b_path, encode_lossy(&join_lines(section.side_b_lines()), b_encoding))?;
            debug!("Saved {} and {}", a_path.display(), b_path.display());

            written.push(WrittenPair {
                basename: section.basename.clone(),
                side_a: a_path,
                side_b: b_path,
                lines: section.len(),
            });

            if let Some(report) = progress.as_deref_mut() {
                report(idx + 1, total);
            }
        }

        info!("Finished importing from {}", document_path.display());
        Ok(ImportSummary {
            kind,
            declared: parsed.declared,
            detection: parsed.detection,
            written,
        })
    }
}

impl Default for DocumentImporter {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

/// Every line is terminated, so padded trailing empty lines survive a re-read
fn join_lines(lines: Vec<&str>) -> String {
    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Output name for a recovered basename, with the declared extension forced on
pub fn output_file_name(basename: &str, kind: FileKind) -> Result<String, SubpairError> {
    if basename.is_empty()
        || basename == "."
        || basename == ".."
        || basename.contains(|c: char| c == '/' || c == '\\')
    {
        return Err(SubpairError::Document(format!(
            "Unsafe file name in section marker: {:?}",
            basename
        )));
    }

    if kind.matches_name(basename) {
        Ok(basename.to_string())
    } else {
        Ok(format!("{}.{}", basename, kind))
    }
}

/// First free path among `path`, `stem_1.ext`, `stem_2.ext`, ...
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut i = 1usize;
    loop {
        let candidate = path.with_file_name(format!("{}_{}{}", stem, i, ext));
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}
