use crate::docx;
use crate::document::{self, COLUMNS};
use crate::encoding::EncodingResolver;
use crate::line_reader::LineReader;
use crate::matcher::PairPlan;
use crate::ProgressFn;
use std::path::{Path, PathBuf};
use subpair_common::{AppConfig, FileKind, FileSection, PairWarning, SubpairError, TabularDocument};
use tracing::{debug, info, warn};

/// Result of one export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub output: PathBuf,
    pub kind: FileKind,
    pub sections: usize,
    pub rows: usize,
    pub warnings: Vec<PairWarning>,
}

/// Serializes matched file pairs into one Word table
pub struct DocumentExporter {
    reader: LineReader,
    side_a_encoding: String,
    side_b_encoding: String,
}

impl DocumentExporter {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            reader: LineReader::new(EncodingResolver::new(config.detection_sample_size)),
            side_a_encoding: config.side_a_encoding.clone(),
            side_b_encoding: config.side_b_encoding.clone(),
        }
    }

    /// Check the plan before anything is read or written
    fn validate(&self, plan: &PairPlan) -> Result<(), SubpairError> {
        if plan.side_a.is_empty() || plan.side_b.is_empty() {
            return Err(SubpairError::config("No files provided"));
        }

        for name in &plan.paired {
            let (a, b) = plan.paths(name).ok_or_else(|| {
                SubpairError::config(format!("{} is not present on both sides", name))
            })?;
            for path in [a, b] {
                if !path.exists() {
                    return Err(SubpairError::not_found(path));
                }
            }
        }

        Ok(())
    }

    /// Read every paired file and zip the two sides into sections.
    ///
    /// `progress` is called with `(done, total)` after each section, `done`
    /// starting at 1.
    pub fn build_document(
        &self,
        plan: &PairPlan,
        side_b_force_encoding: Option<&str>,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<TabularDocument, SubpairError> {
        self.validate(plan)?;
        self.read_sections(plan, side_b_force_encoding, progress)
    }

    fn read_sections(
        &self,
        plan: &PairPlan,
        side_b_force_encoding: Option<&str>,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<TabularDocument, SubpairError> {
        let mut document = TabularDocument::new(plan.kind);
        let total = plan.paired.len();

        for (idx, name) in plan.paired.iter().enumerate() {
            let (a_path, b_path) = plan
                .paths(name)
                .ok_or_else(|| SubpairError::config(format!("{} is not paired", name)))?;

            let a_lines = self.reader.read_lines(a_path, &self.side_a_encoding, None)?;
            let b_lines = self
                .reader
                .read_lines(b_path, &self.side_b_encoding, side_b_force_encoding)?;

            let section = FileSection::from_lines(name.as_str(), a_lines, b_lines);
            debug!("Section {} has {} rows", name, section.len());
            document.sections.push(section);

            if let Some(report) = progress.as_deref_mut() {
                report(idx + 1, total);
            }
        }

        Ok(document)
    }

    /// Export the plan to `output`, creating or replacing it
    pub fn export(
        &self,
        plan: &PairPlan,
        output: &Path,
        side_b_force_encoding: Option<&str>,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<ExportSummary, SubpairError> {
        self.validate(plan)?;

        let warnings = plan.warnings();
        for warning in &warnings {
            warn!("{}", warning);
        }

        let document = self.read_sections(plan, side_b_force_encoding, progress)?;
        let rows = document::to_rows(&document);
        docx::save_table(output, COLUMNS, &rows)?;
        info!("Word document saved: {}", output.display());

        Ok(ExportSummary {
            output: output.to_path_buf(),
            kind: document.kind,
            sections: document.sections.len(),
            rows: rows.len(),
            warnings,
        })
    }
}

impl Default for DocumentExporter {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}
