use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::Serialize;

/// Declared format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolves the format from a filename extension (case-insensitive).
    /// Returns `None` for anything other than `.pdf` / `.docx`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document. Immutable; consumed once by the extractor.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub format: DocumentFormat,
    pub bytes: Bytes,
}

impl Document {
    pub fn new(filename: impl Into<String>, format: DocumentFormat, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            format,
            bytes: bytes.into(),
        }
    }
}

/// One unit of extracted text. `index` is the position in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub text: String,
}

impl Page {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
