use super::types::{ExtractedText, ExtractionMethod, OffsetSpan, RawPage};
use super::ExtractionError;

/// Paragraph separator in normalized text.
pub const PARAGRAPH_BREAK: &str = "\n\n";

/// Sanitize one line of extracted text.
/// Strips control characters and zero-width marks, maps exotic spaces to a
/// plain space, collapses whitespace runs and trims.
pub fn sanitize_line(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        let c = match c {
            '\u{00A0}' | '\u{2007}' | '\u{202F}' | '\t' => ' ',
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => continue,
            c if c.is_control() => continue,
            c => c,
        };
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }

    out
}

/// Split raw page text into paragraphs (blank-line delimited).
/// Returns `(byte offset in raw text, cleaned paragraph)` pairs; lines inside
/// a paragraph are kept on separate lines.
pub fn split_paragraphs(raw: &str) -> Vec<(usize, String)> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut current_start = 0;
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        let cleaned = sanitize_line(line);
        if cleaned.is_empty() {
            if !current.is_empty() {
                paragraphs.push((current_start, std::mem::take(&mut current)));
            }
        } else {
            if current.is_empty() {
                current_start = offset;
            } else {
                current.push('\n');
            }
            current.push_str(&cleaned);
        }
        offset += line.len();
    }

    if !current.is_empty() {
        paragraphs.push((current_start, current));
    }

    paragraphs
}

/// Normalize raw pages into a single text with its offset map.
pub fn assemble_text(
    method: ExtractionMethod,
    pages: &[RawPage],
) -> Result<ExtractedText, ExtractionError> {
    let mut text = String::new();
    let mut spans = Vec::new();
    let mut char_len = 0;
    let mut paragraph = 0;

    for page in pages {
        for (original_offset, para) in split_paragraphs(&page.text) {
            if !text.is_empty() {
                text.push_str(PARAGRAPH_BREAK);
                char_len += PARAGRAPH_BREAK.len();
            }
            spans.push(OffsetSpan {
                text_start: char_len,
                page: page.page_number,
                paragraph,
                original_offset,
            });
            char_len += para.chars().count();
            text.push_str(&para);
            paragraph += 1;
        }
    }

    if spans.is_empty() {
        return Err(ExtractionError::CorruptFile("no extractable text".into()));
    }

    let page_count = match method {
        ExtractionMethod::PdfTextLayer => Some(pages.len()),
        _ => None,
    };

    Ok(ExtractedText {
        method,
        text,
        spans,
        page_count,
        char_len,
    })
}
