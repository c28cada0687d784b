use crate::scanner::FolderScanner;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use subpair_common::{
    AppConfig, FileHandle, FileKind, PairOrder, PairWarning, Side, SubpairError,
};
use tracing::{debug, info, warn};

/// Basenames present on both sides, plus the ones present on one side only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairMatch {
    pub paired: Vec<String>,
    pub missing_on_b: BTreeSet<String>,
    pub missing_on_a: BTreeSet<String>,
}

/// Everything the exporter needs: what to pair, where each file lives, and the declared type
#[derive(Debug, Clone)]
pub struct PairPlan {
    pub kind: FileKind,
    pub paired: Vec<String>,
    pub side_a: HashMap<String, PathBuf>,
    pub side_b: HashMap<String, PathBuf>,
    pub missing_on_b: BTreeSet<String>,
    pub missing_on_a: BTreeSet<String>,
}

impl PairPlan {
    /// Paths of a paired basename as (side A, side B)
    pub fn paths(&self, basename: &str) -> Option<(&Path, &Path)> {
        let a = self.side_a.get(basename)?;
        let b = self.side_b.get(basename)?;
        Some((a.as_path(), b.as_path()))
    }

    pub fn warnings(&self) -> Vec<PairWarning> {
        let mut warnings = Vec::new();
        if !self.missing_on_b.is_empty() {
            warnings.push(PairWarning {
                missing_on: Side::B,
                basenames: self.missing_on_b.iter().cloned().collect(),
            });
        }
        if !self.missing_on_a.is_empty() {
            warnings.push(PairWarning {
                missing_on: Side::A,
                basenames: self.missing_on_a.iter().cloned().collect(),
            });
        }
        warnings
    }

    pub fn is_empty(&self) -> bool {
        self.paired.is_empty()
    }
}

/// Matches two collections of files by basename
pub struct PairMatcher {
    scanner: FolderScanner,
    order: PairOrder,
    allow_duplicates: bool,
}

impl PairMatcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            scanner: FolderScanner::new(config),
            order: config.pair_order,
            allow_duplicates: config.allow_duplicate_basenames,
        }
    }

    /// Intersect two handle collections by basename.
    ///
    /// Duplicate basenames within one side are a configuration error unless
    /// duplicates are allowed, in which case the last handle wins.
    pub fn match_handles(
        &self,
        side_a: &[FileHandle],
        side_b: &[FileHandle],
        order: PairOrder,
    ) -> Result<PairMatch, SubpairError> {
        let a_names = self.unique_basenames(side_a, Side::A)?;
        let b_names: HashSet<&str> = self
            .unique_basenames(side_b, Side::B)?
            .into_iter()
            .collect();
        let a_set: HashSet<&str> = a_names.iter().copied().collect();

        let mut paired: Vec<String> = a_names
            .iter()
            .filter(|name| b_names.contains(*name))
            .map(|name| name.to_string())
            .collect();
        if order == PairOrder::Sorted {
            paired.sort();
        }

        let missing_on_b = a_set
            .iter()
            .filter(|name| !b_names.contains(*name))
            .map(|name| name.to_string())
            .collect();
        let missing_on_a = b_names
            .iter()
            .filter(|name| !a_set.contains(*name))
            .map(|name| name.to_string())
            .collect();

        Ok(PairMatch {
            paired,
            missing_on_b,
            missing_on_a,
        })
    }

    /// Basenames in first-seen order, enforcing the duplicate policy
    fn unique_basenames<'a>(
        &self,
        handles: &'a [FileHandle],
        side: Side,
    ) -> Result<Vec<&'a str>, SubpairError> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(handles.len());

        for handle in handles {
            if seen.insert(handle.basename.as_str()) {
                names.push(handle.basename.as_str());
            } else if self.allow_duplicates {
                warn!(
                    "Duplicate basename {} on {}, using {}",
                    handle.basename,
                    side,
                    handle.path.display()
                );
            } else {
                return Err(SubpairError::config(format!(
                    "Duplicate basename {} on {}",
                    handle.basename, side
                )));
            }
        }

        Ok(names)
    }

    /// Explicit-list mode: exact paths on both sides.
    ///
    /// All side A paths must share exactly one extension, `txt` or `srt`.
    pub fn from_paths(
        &self,
        side_a: &[PathBuf],
        side_b: &[PathBuf],
    ) -> Result<PairPlan, SubpairError> {
        if side_a.is_empty() || side_b.is_empty() {
            return Err(SubpairError::config("No files provided"));
        }

        for path in side_a.iter().chain(side_b) {
            if !path.exists() {
                return Err(SubpairError::not_found(path));
            }
        }

        let a_handles = to_handles(side_a)?;
        let b_handles = to_handles(side_b)?;

        let extensions: BTreeSet<String> = side_a
            .iter()
            .map(|p| {
                p.extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default()
            })
            .collect();
        let kind = match extensions.iter().next() {
            Some(ext) if extensions.len() == 1 => FileKind::from_extension(ext),
            _ => None,
        }
        .ok_or_else(|| {
            SubpairError::config("Ambiguous or unsupported file extensions in side A files")
        })?;

        let matched = self.match_handles(&a_handles, &b_handles, self.order)?;
        info!(
            "Matched {} of {} side A files by explicit list",
            matched.paired.len(),
            a_handles.len()
        );
        Ok(build_plan(kind, matched, a_handles, b_handles))
    }

    /// Folder mode: every file of the declared type directly inside each folder.
    ///
    /// When `kind` is omitted it is inferred from side A; exactly one of
    /// `txt`/`srt` must be present there.
    pub fn from_folders(
        &self,
        side_a_dir: &Path,
        side_b_dir: &Path,
        kind: Option<FileKind>,
    ) -> Result<PairPlan, SubpairError> {
        for dir in [side_a_dir, side_b_dir] {
            if !dir.is_dir() {
                return Err(SubpairError::not_found(dir));
            }
        }

        let a_files = self.scanner.scan(side_a_dir)?;
        let b_files = self.scanner.scan(side_b_dir)?;

        let kind = match kind {
            Some(kind) => kind,
            None => infer_kind(&a_files)?,
        };
        debug!("Folder mode with file type {}", kind);

        let a_handles: Vec<FileHandle> = a_files
            .into_iter()
            .filter(|h| kind.matches_name(&h.basename))
            .collect();
        let b_handles: Vec<FileHandle> = b_files
            .into_iter()
            .filter(|h| kind.matches_name(&h.basename))
            .collect();

        if a_handles.is_empty() && b_handles.is_empty() {
            return Err(SubpairError::config(format!(
                "No .{} files in {} or {}",
                kind,
                side_a_dir.display(),
                side_b_dir.display()
            )));
        }

        let matched = self.match_handles(&a_handles, &b_handles, PairOrder::Sorted)?;
        info!(
            "Matched {} of {} side A files in {}",
            matched.paired.len(),
            a_handles.len(),
            side_a_dir.display()
        );
        Ok(build_plan(kind, matched, a_handles, b_handles))
    }
}

impl Default for PairMatcher {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

fn to_handles(paths: &[PathBuf]) -> Result<Vec<FileHandle>, SubpairError> {
    paths
        .iter()
        .map(|p| {
            FileHandle::from_path(p).ok_or_else(|| {
                SubpairError::config(format!("Path has no usable file name: {}", p.display()))
            })
        })
        .collect()
}

fn infer_kind(files: &[FileHandle]) -> Result<FileKind, SubpairError> {
    let kinds: BTreeSet<&'static str> = files
        .iter()
        .filter_map(|h| FileKind::from_path(&h.path))
        .map(|k| k.as_str())
        .collect();

    match kinds.iter().next() {
        Some(kind) if kinds.len() == 1 => FileKind::from_extension(kind)
            .ok_or_else(|| SubpairError::config(format!("Unsupported file type {}", kind))),
        _ => Err(SubpairError::config(
            "Ambiguous or unsupported file extensions in side A folder",
        )),
    }
}

fn build_plan(
    kind: FileKind,
    matched: PairMatch,
    a_handles: Vec<FileHandle>,
    b_handles: Vec<FileHandle>,
) -> PairPlan {
    // Later handles overwrite earlier ones: last wins for allowed duplicates
    let side_a = a_handles
        .into_iter()
        .map(|h| (h.basename, h.path))
        .collect();
    let side_b = b_handles
        .into_iter()
        .map(|h| (h.basename, h.path))
        .collect();

    PairPlan {
        kind,
        paired: matched.paired,
        side_a,
        side_b,
        missing_on_b: matched.missing_on_b,
        missing_on_a: matched.missing_on_a,
    }
}
