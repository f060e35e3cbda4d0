use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::SourceLocation;

/// How text was extracted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtractionMethod {
    PdfTextLayer,
    DocxBody,
    PlainTextRead,
}

/// Raw text of one page (or the whole document for unpaginated formats),
/// before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// 1-based page number; `None` for formats without pages.
    pub page_number: Option<u32>,
    pub text: String,
}

/// Maps a run of output characters back to its source.
///
/// Spans are sorted by `text_start` and each covers one paragraph of the
/// normalized text, up to the next span's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetSpan {
    /// Character index in `ExtractedText::text` where the paragraph starts.
    pub text_start: usize,
    pub page: Option<u32>,
    /// 0-based paragraph ordinal across the whole document.
    pub paragraph: usize,
    /// Byte offset of the paragraph in its raw page text.
    pub original_offset: usize,
}

/// Normalized UTF-8 text with its offset map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub method: ExtractionMethod,
    /// Paragraphs separated by exactly one blank line.
    pub text: String,
    pub spans: Vec<OffsetSpan>,
    pub page_count: Option<usize>,
    /// Length of `text` in characters.
    pub char_len: usize,
}

impl ExtractedText {
    /// Source location of the character at `char_pos`.
    pub fn location_at(&self, char_pos: usize) -> SourceLocation {
        let idx = self
            .spans
            .partition_point(|span| span.text_start <= char_pos)
            .saturating_sub(1);
        match self.spans.get(idx) {
            Some(span) => SourceLocation {
                page: span.page,
                paragraph: span.paragraph,
                original_offset: span.original_offset,
            },
            None => SourceLocation {
                page: None,
                paragraph: 0,
                original_offset: 0,
            },
        }
    }

    pub fn paragraph_count(&self) -> usize {
        self.spans.len()
    }
}

/// Format-specific raw text reader (allows mocking for tests)
pub trait FormatReader {
    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<RawPage>, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractedText {
        ExtractedText {
            method: ExtractionMethod::PdfTextLayer,
            text: "First para.\n\nSecond para.\n\nThird.".into(),
            spans: vec![
                OffsetSpan { text_start: 0, page: Some(1), paragraph: 0, original_offset: 0 },
                OffsetSpan { text_start: 13, page: Some(1), paragraph: 1, original_offset: 14 },
                OffsetSpan { text_start: 27, page: Some(2), paragraph: 2, original_offset: 0 },
            ],
            page_count: Some(2),
            char_len: 33,
        }
    }

    #[test]
    fn location_maps_into_containing_paragraph() {
        let text = sample();
        assert_eq!(text.location_at(0).paragraph, 0);
        assert_eq!(text.location_at(12).paragraph, 0);
        assert_eq!(text.location_at(13).paragraph, 1);
        let last = text.location_at(30);
        assert_eq!(last.paragraph, 2);
        assert_eq!(last.page, Some(2));
    }

    #[test]
    fn location_past_end_uses_last_span() {
        assert_eq!(sample().location_at(10_000).paragraph, 2);
    }
}
