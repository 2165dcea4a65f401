//! # Text Normalizer
//!
//! Turns pasted text or an already-read upload into the plain text that is
//! stored on a summary and sent to the AI provider.
//!
//! Format specific extraction (e.g. Word documents) is left to the caller,
//! only plain text and markdown uploads are decoded here.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("No text content found")]
    Empty,
    #[error("Text length ({length} characters) exceeds maximum limit ({max_length} characters)")]
    TooLarge { length: usize, max_length: usize },
    #[error("A title is required")]
    MissingTitle,
    #[error("No recipients provided")]
    NoRecipients,
    #[error("Unsupported file type: {extension:?}. Supported types: .txt, .md")]
    UnsupportedFileType { extension: String },
    #[error("File size ({size} bytes) exceeds maximum limit ({max_size} bytes)")]
    UploadTooLarge { size: usize, max_size: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
    word_count: u32,
}

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> u32 {
        self.word_count
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Cleans `raw` and checks it against `max_length` (in characters).
///
/// Line endings are converted to `\n`, control characters other than newline
/// and tab are dropped and surrounding whitespace is trimmed. Oversized text is
/// rejected rather than truncated.
pub fn normalize(raw: &str, max_length: usize) -> Result<NormalizedText, InputError> {
    let text = raw
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>();

    let text = text.trim();
    if text.is_empty() {
        return Err(InputError::Empty);
    }

    let length = text.chars().count();
    if length > max_length {
        return Err(InputError::TooLarge { length, max_length });
    }

    Ok(NormalizedText {
        word_count: word_count(text),
        text: text.to_string(),
    })
}

pub fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Decodes an uploaded plain text or markdown file.
///
/// UTF-8 is tried first, Latin-1 is used as the fallback since every byte
/// sequence is valid Latin-1.
pub fn decode_upload(
    file_name: &str,
    bytes: &[u8],
    max_upload_bytes: usize,
) -> Result<String, InputError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(InputError::UnsupportedFileType { extension });
    }

    if bytes.len() > max_upload_bytes {
        return Err(InputError::UploadTooLarge {
            size: bytes.len(),
            max_size: max_upload_bytes,
        });
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    };

    Ok(text)
}
