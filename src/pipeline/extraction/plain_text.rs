use super::types::{FormatReader, RawPage};
use super::ExtractionError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Plain UTF-8 text reader. The whole document is a single unpaginated page.
pub struct PlainTextReader;

impl FormatReader for PlainTextReader {
    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<RawPage>, ExtractionError> {
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        if body.contains(&0) {
            return Err(ExtractionError::CorruptFile(
                "binary content in plain text document".into(),
            ));
        }

        let text = std::str::from_utf8(body)
            .map_err(|e| ExtractionError::CorruptFile(format!("invalid UTF-8: {e}")))?;

        Ok(vec![RawPage {
            page_number: None,
            text: text.replace("\r\n", "\n").replace('\r', "\n"),
        }])
    }
}
