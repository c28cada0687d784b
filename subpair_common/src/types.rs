use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Declared type of the paired files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Plain text
    #[default]
    Txt,
    /// SubRip subtitles
    Srt,
}

impl FileKind {
    pub const ALL: [FileKind; 2] = [FileKind::Txt, FileKind::Srt];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Txt => "txt",
            FileKind::Srt => "srt",
        }
    }

    /// Match an extension (without the dot), ignoring case
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(ext))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether `name` already ends with `.{ext}` (case-insensitive)
    pub fn matches_name(&self, name: &str) -> bool {
        let suffix = format!(".{}", self.as_str());
        name.len() >= suffix.len()
            && name
                .get(name.len() - suffix.len()..)
                .map_or(false, |tail| tail.eq_ignore_ascii_case(&suffix))
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('.');
        Self::from_extension(trimmed)
            .ok_or_else(|| format!("unsupported file type '{}', expected txt or srt", s))
    }
}

/// One of the two parallel collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Source language (historically English)
    A,
    /// Target language (historically Russian)
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("side A"),
            Side::B => f.write_str("side B"),
        }
    }
}

/// A file on one side, keyed by its basename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub basename: String,
    pub path: PathBuf,
}

impl FileHandle {
    /// Build a handle from a path; `None` when the path has no UTF-8 file name
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let basename = path.file_name()?.to_str()?.to_string();
        Some(Self { basename, path })
    }
}

/// One aligned row: line `i` of side A next to line `i` of side B
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinePair {
    pub side_a: String,
    pub side_b: String,
}

impl LinePair {
    pub fn new(side_a: impl Into<String>, side_b: impl Into<String>) -> Self {
        Self {
            side_a: side_a.into(),
            side_b: side_b.into(),
        }
    }
}

/// All line pairs of one basename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSection {
    pub basename: String,
    pub pairs: Vec<LinePair>,
}

impl FileSection {
    pub fn new(basename: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            pairs: Vec::new(),
        }
    }

    /// Zip two line sequences positionally, padding the shorter one with empty strings
    pub fn from_lines(
        basename: impl Into<String>,
        side_a: Vec<String>,
        side_b: Vec<String>,
    ) -> Self {
        let len = side_a.len().max(side_b.len());
        let mut a_iter = side_a.into_iter();
        let mut b_iter = side_b.into_iter();
        let pairs = (0..len)
            .map(|_| LinePair {
                side_a: a_iter.next().unwrap_or_default(),
                side_b: b_iter.next().unwrap_or_default(),
            })
            .collect();

        Self {
            basename: basename.into(),
            pairs,
        }
    }

    pub fn side_a_lines(&self) -> Vec<&str> {
        self.pairs.iter().map(|p| p.side_a.as_str()).collect()
    }

    pub fn side_b_lines(&self) -> Vec<&str> {
        self.pairs.iter().map(|p| p.side_b.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The persisted two-column document: a file-type tag plus ordered sections
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TabularDocument {
    pub kind: FileKind,
    pub sections: Vec<FileSection>,
}

impl TabularDocument {
    pub fn new(kind: FileKind) -> Self {
        Self {
            kind,
            sections: Vec::new(),
        }
    }

    /// Number of table rows: header, one marker per section, one row per pair
    pub fn row_count(&self) -> usize {
        1 + self
            .sections
            .iter()
            .map(|s| 1 + s.pairs.len())
            .sum::<usize>()
    }
}

/// Basenames present on one side only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairWarning {
    /// The side the files are missing on
    pub missing_on: Side,
    pub basenames: Vec<String>,
}

impl fmt::Display for PairWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missing {} files for: {}",
            self.missing_on,
            self.basenames.join(", ")
        )
    }
}

/// Order in which paired basenames are laid out in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairOrder {
    /// Sorted by basename
    #[default]
    Sorted,
    /// Order of first appearance on side A (explicit lists only)
    FirstSeen,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fallback encoding label for side A files
    #[serde(default = "default_side_a_encoding")]
    pub side_a_encoding: String,

    /// Fallback encoding label for side B files
    #[serde(default = "default_side_b_encoding")]
    pub side_b_encoding: String,

    /// Encoding label that bypasses detection for side B files
    #[serde(default)]
    pub side_b_force_encoding: Option<String>,

    /// Number of leading bytes fed to charset detection
    #[serde(default = "default_sample_size")]
    pub detection_sample_size: usize,

    /// Ignore patterns applied in folder mode (e.g., "*_log.txt")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Layout order of paired basenames
    #[serde(default)]
    pub pair_order: PairOrder,

    /// Accept duplicate basenames on one side (last path wins)
    #[serde(default)]
    pub allow_duplicate_basenames: bool,

    /// Replace existing files on import instead of picking `_1`, `_2`, ... names
    #[serde(default)]
    pub overwrite: bool,

    /// Write a plain-text run log next to the exported or imported document
    #[serde(default = "default_true")]
    pub write_run_log: bool,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            side_a_encoding: default_side_a_encoding(),
            side_b_encoding: default_side_b_encoding(),
            side_b_force_encoding: None,
            detection_sample_size: default_sample_size(),
            ignore_patterns: Vec::new(),
            pair_order: PairOrder::default(),
            allow_duplicate_basenames: false,
            overwrite: false,
            write_run_log: true,
            portable_mode: false,
        }
    }
}

fn default_side_a_encoding() -> String {
    "utf-8".to_string()
}

fn default_side_b_encoding() -> String {
    "windows-1251".to_string()
}

fn default_sample_size() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_parsing() {
        assert_eq!(FileKind::from_extension("SRT"), Some(FileKind::Srt));
        assert_eq!(FileKind::from_extension("txt"), Some(FileKind::Txt));
        assert_eq!(FileKind::from_extension("docx"), None);
        assert_eq!(".srt".parse::<FileKind>().unwrap(), FileKind::Srt);
        assert!("md".parse::<FileKind>().is_err());
    }

    #[test]
    fn test_file_kind_matches_name() {
        assert!(FileKind::Txt.matches_name("episode.TXT"));
        assert!(!FileKind::Txt.matches_name("episode.srt"));
        assert!(!FileKind::Srt.matches_name("srt"));
    }

    #[test]
    fn test_section_pads_short_side() {
        let section = FileSection::from_lines(
            "greeting.txt",
            vec!["Hello".to_string(), "World".to_string()],
            vec!["Привет".to_string()],
        );

        assert_eq!(
            section.pairs,
            vec![LinePair::new("Hello", "Привет"), LinePair::new("World", "")]
        );
        assert_eq!(section.side_b_lines(), vec!["Привет", ""]);
    }

    #[test]
    fn test_row_count() {
        let mut doc = TabularDocument::new(FileKind::Txt);
        doc.sections.push(FileSection::new("empty.txt"));
        doc.sections.push(FileSection::from_lines(
            "two.txt",
            vec!["a".into(), "b".into()],
            vec![],
        ));
        assert_eq!(doc.row_count(), 1 + 1 + 3);
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.side_a_encoding, "utf-8");
        assert_eq!(config.side_b_encoding, "windows-1251");
        assert_eq!(config.detection_sample_size, 10_000);
        assert_eq!(config.pair_order, PairOrder::Sorted);
        assert!(config.write_run_log);
        assert!(!config.overwrite);
    }

    #[test]
    fn test_config_pair_order_kebab_case() {
        let config: AppConfig = toml::from_str("pair_order = \"first-seen\"").unwrap();
        assert_eq!(config.pair_order, PairOrder::FirstSeen);
    }
}
