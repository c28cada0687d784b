use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::{Parallelism, WalkDir};
use std::path::Path;
use subpair_common::{AppConfig, FileHandle, SubpairError};
use tracing::debug;

/// Flat folder scanner: lists the regular files directly inside a folder
pub struct FolderScanner {
    custom_ignore: Option<Gitignore>,
}

impl FolderScanner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            custom_ignore: Self::build_custom_ignore(&config.ignore_patterns),
        }
    }

    /// Build a Gitignore from custom ignore patterns in config
    fn build_custom_ignore(patterns: &[String]) -> Option<Gitignore> {
        if patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                debug!("Failed to add ignore pattern '{}': {}", pattern, err);
            } else {
                debug!("Added custom ignore pattern: {}", pattern);
            }
        }

        match builder.build() {
            Ok(ignore) => {
                debug!("Built custom ignore with {} patterns", patterns.len());
                Some(ignore)
            }
            Err(e) => {
                debug!("Failed to build custom ignore: {}", e);
                None
            }
        }
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.custom_ignore
            .as_ref()
            .map_or(false, |ignore| ignore.matched(name, false).is_ignore())
    }

    /// List files (not directories) directly inside `root`, sorted by name
    pub fn scan(&self, root: &Path) -> Result<Vec<FileHandle>, SubpairError> {
        if !root.is_dir() {
            return Err(SubpairError::not_found(root));
        }

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .skip_hidden(false)
            .sort(true)
            .parallelism(Parallelism::Serial);

        let mut handles = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                SubpairError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Walk error: {}", e),
                ))
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(handle) = FileHandle::from_path(&path) else {
                debug!("Skipping non UTF-8 file name {:?}", path);
                continue;
            };

            if self.is_ignored(&handle.basename) {
                debug!("Ignoring {}", handle.basename);
                continue;
            }

            handles.push(handle);
        }

        debug!("Scanned {} files from {:?}", handles.len(), root);
        Ok(handles)
    }
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}
