pub mod encoding;
pub mod line_reader;
pub mod scanner;
pub mod matcher;
pub mod docx;
pub mod document;
pub mod exporter;
pub mod importer;

#[cfg(test)]
mod tests_roundtrip;

/// Progress callback: `(done, total)` with `done` counted from 1
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

pub use encoding::EncodingResolver;
pub use line_reader::LineReader;
pub use scanner::FolderScanner;
pub use matcher::{PairMatch, PairMatcher, PairPlan};
pub use document::{MarkerDetection, ParsedDocument};
pub use exporter::{DocumentExporter, ExportSummary};
pub use importer::{DocumentImporter, ImportSummary, WrittenPair};
