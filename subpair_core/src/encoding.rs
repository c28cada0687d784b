use chardetng::EncodingDetector;
use encoding_rs::{EncoderResult, Encoding, WINDOWS_1251, X_MAC_CYRILLIC};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use subpair_common::SubpairError;
use tracing::debug;

pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;

/// Guesses the byte encoding of text files from a leading sample
#[derive(Debug, Clone, Copy)]
pub struct EncodingResolver {
    sample_size: usize,
}

impl EncodingResolver {
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    /// Run charset detection on the first `sample_size` bytes.
    ///
    /// Returns `None` when the sample carries no signal: an empty file or a
    /// pure-ASCII prefix, which every supported encoding decodes the same way.
    /// Mac-Cyrillic guesses are rewritten to Windows-1251.
    pub fn detect(&self, path: &Path) -> Result<Option<&'static Encoding>, SubpairError> {
        let mut sample = Vec::with_capacity(self.sample_size.min(64 * 1024));
        File::open(path)?
            .take(self.sample_size as u64)
            .read_to_end(&mut sample)?;

        if sample.is_empty() || sample.is_ascii() {
            debug!("{} has no encoding signal in its first {} bytes", path.display(), sample.len());
            return Ok(None);
        }

        let mut detector = EncodingDetector::new();
        // A full sample may end inside a multi-byte sequence
        let last = sample.len() < self.sample_size;
        detector.feed(&sample, last);
        let guess = normalize(detector.guess(None, true));

        debug!("{} encoding detected as {}", path.display(), guess.name());
        Ok(Some(guess))
    }

    /// Detected encoding, or `default` when detection has no answer
    pub fn resolve(
        &self,
        path: &Path,
        default: &'static Encoding,
    ) -> Result<&'static Encoding, SubpairError> {
        Ok(self.detect(path)?.unwrap_or(default))
    }
}

impl Default for EncodingResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

/// The detector conflates Mac-Cyrillic with Windows-1251; the corpus is Windows-authored
pub fn normalize(encoding: &'static Encoding) -> &'static Encoding {
    if encoding == X_MAC_CYRILLIC {
        WINDOWS_1251
    } else {
        encoding
    }
}

/// Resolve a WHATWG label such as `cp1251`, `utf-8` or `koi8-r`
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Like [`lookup`], but an unknown label is an encoding error
pub fn require(label: &str) -> Result<&'static Encoding, SubpairError> {
    lookup(label).ok_or_else(|| SubpairError::Encoding(format!("unknown encoding label '{}'", label)))
}

/// Encode `text`, writing `?` for characters the target encoding cannot represent
pub fn encode_lossy(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    if encoding.output_encoding() == encoding_rs::UTF_8 {
        return text.as_bytes().to_vec();
    }

    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut buffer = [0u8; 4096];
    let mut remaining = text;

    loop {
        let (result, read, written) =
            encoder.encode_from_utf8_without_replacement(remaining, &mut buffer, true);
        out.extend_from_slice(&buffer[..written]);
        remaining = &remaining[read..];

        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => out.push(b'?'),
        }
    }

    out
}
