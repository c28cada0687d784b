use crate::encoding::{self, EncodingResolver};
use encoding_rs::Encoding;
use std::fs;
use std::path::Path;
use subpair_common::SubpairError;
use tracing::{debug, error};

/// Reads text files into logical lines, recovering from bad encodings
#[derive(Debug, Clone, Copy, Default)]
pub struct LineReader {
    resolver: EncodingResolver,
}

impl LineReader {
    pub fn new(resolver: EncodingResolver) -> Self {
        Self { resolver }
    }

    /// Read every line of `path`.
    ///
    /// Encoding precedence is `force_encoding`, then the detected encoding,
    /// then `default_encoding`. Malformed bytes decode to U+FFFD. When the
    /// chosen label is not a known encoding the read is retried once with
    /// `default_encoding`.
    pub fn read_lines(
        &self,
        path: &Path,
        default_encoding: &str,
        force_encoding: Option<&str>,
    ) -> Result<Vec<String>, SubpairError> {
        let bytes = fs::read(path)?;

        let (chosen, source) = match force_encoding {
            Some(label) => (encoding::require(label), "forced"),
            None => (
                encoding::require(default_encoding).and_then(|default| self.resolver.resolve(path, default)),
                "auto-detected",
            ),
        };

        let encoding = match chosen {
            Ok(encoding) => encoding,
            Err(SubpairError::Encoding(msg)) => {
                error!("Failed reading {} with {} encoding: {}", path.display(), source, msg);
                let fallback = encoding::require(default_encoding)?;
                let lines = decode_lines(&bytes, fallback);
                debug!(
                    "Fallback read {} lines from {} using {}",
                    lines.len(),
                    path.display(),
                    fallback.name()
                );
                return Ok(lines);
            }
            Err(e) => return Err(e),
        };

        debug!("Reading {} with {} encoding {}", path.display(), source, encoding.name());
        let lines = decode_lines(&bytes, encoding);
        debug!("Read {} lines from {}", lines.len(), path.display());
        Ok(lines)
    }
}

/// Decode with replacement and split into lines
pub fn decode_lines(bytes: &[u8], encoding: &'static Encoding) -> Vec<String> {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        debug!("Replaced malformed {} sequences while decoding", encoding.name());
    }
    split_lines(&text)
}

/// Split on `\n`, `\r\n` or a lone `\r`, removing only the terminator.
///
/// A trailing terminator does not start an extra line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
