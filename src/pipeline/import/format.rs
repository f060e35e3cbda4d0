use serde::{Deserialize, Serialize};

use crate::models::SourceFormat;

/// How far into a PDF the `%PDF` marker may appear (some writers prepend junk).
const PDF_MARKER_WINDOW: usize = 1024;

/// Container family recognised from magic bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentSniff {
    Pdf,
    /// ZIP container (DOCX is a ZIP archive).
    Zip,
    /// Valid UTF-8 without NUL bytes.
    Text,
    Binary,
}

impl ContentSniff {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Zip => "zip",
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Detect the container family from magic bytes (NOT from the declared label).
///
/// A `%PDF` marker counts only at the start (after whitespace or a BOM) or
/// behind a binary preamble; text that merely quotes a PDF header is text.
pub fn sniff_content(bytes: &[u8]) -> ContentSniff {
    let is_text = !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok();
    if let Some(pos) = pdf_marker_position(bytes) {
        let preamble = bytes[..pos].strip_prefix(UTF8_BOM).unwrap_or(&bytes[..pos]);
        if preamble.iter().all(u8::is_ascii_whitespace) || !is_text {
            return ContentSniff::Pdf;
        }
    }
    if bytes.starts_with(b"PK\x03\x04") {
        return ContentSniff::Zip;
    }
    if is_text {
        return ContentSniff::Text;
    }
    ContentSniff::Binary
}

fn pdf_marker_position(bytes: &[u8]) -> Option<usize> {
    let head = &bytes[..bytes.len().min(PDF_MARKER_WINDOW)];
    head.windows(4).position(|w| w == b"%PDF")
}

/// Check that the bytes agree with the declared format.
/// Returns the detected family on mismatch so the caller can report it.
pub fn check_declared_format(format: SourceFormat, bytes: &[u8]) -> Result<(), ContentSniff> {
    let sniffed = sniff_content(bytes);
    let consistent = match format {
        SourceFormat::Pdf => sniffed == ContentSniff::Pdf,
        SourceFormat::Docx => sniffed == ContentSniff::Zip,
        SourceFormat::PlainText => sniffed == ContentSniff::Text,
    };
    if consistent {
        Ok(())
    } else {
        Err(sniffed)
    }
}
