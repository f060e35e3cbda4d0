use uuid::Uuid;

use super::docx::DocxReader;
use super::pdf::PdfTextReader;
use super::plain_text::PlainTextReader;
use super::sanitize::assemble_text;
use super::types::{ExtractedText, ExtractionMethod, FormatReader};
use super::ExtractionError;
use crate::models::SourceFormat;
use crate::pipeline::import::format::check_declared_format;

/// Concrete implementation of the text extractor.
/// Uses trait objects for the format readers, enabling dependency injection.
pub struct DocumentExtractor {
    pdf_reader: Box<dyn FormatReader + Send + Sync>,
    docx_reader: Box<dyn FormatReader + Send + Sync>,
    text_reader: Box<dyn FormatReader + Send + Sync>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self {
            pdf_reader: Box::new(PdfTextReader),
            docx_reader: Box::new(DocxReader),
            text_reader: Box::new(PlainTextReader),
        }
    }
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the PDF reader (tests, alternative engines).
    pub fn with_pdf_reader(mut self, reader: Box<dyn FormatReader + Send + Sync>) -> Self {
        self.pdf_reader = reader;
        self
    }

    /// Extract normalized text from raw bytes.
    ///
    /// `format` is the parsed declared format; `None` means the declared label
    /// named a format we cannot read. Pure: the same input always yields the
    /// same text and offset map.
    pub fn extract(
        &self,
        document_id: &Uuid,
        format: Option<SourceFormat>,
        declared: &str,
        bytes: &[u8],
    ) -> Result<ExtractedText, ExtractionError> {
        let format =
            format.ok_or_else(|| ExtractionError::UnsupportedFormat(declared.to_string()))?;

        tracing::info!(
            document_id = %document_id,
            format = format.as_str(),
            bytes = bytes.len(),
            "Starting text extraction"
        );

        check_declared_format(format, bytes).map_err(|detected| {
            ExtractionError::CorruptFile(format!(
                "declared {} but content looks like {}",
                format.as_str(),
                detected.as_str()
            ))
        })?;

        let (method, reader) = match format {
            SourceFormat::Pdf => (ExtractionMethod::PdfTextLayer, &self.pdf_reader),
            SourceFormat::Docx => (ExtractionMethod::DocxBody, &self.docx_reader),
            SourceFormat::PlainText => (ExtractionMethod::PlainTextRead, &self.text_reader),
        };

        let pages = reader.read_pages(bytes)?;
        let extracted = assemble_text(method, &pages)?;

        tracing::info!(
            document_id = %document_id,
            method = ?method,
            pages = ?extracted.page_count,
            paragraphs = extracted.paragraph_count(),
            chars = extracted.char_len,
            "Text extraction complete"
        );

        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::docx::tests::make_docx;
    use crate::pipeline::extraction::pdf::tests::make_test_pdf;
    use crate::pipeline::extraction::types::RawPage;

    /// Mock PDF reader returning fixed pages.
    struct MockPdfReader {
        pages: Vec<RawPage>,
    }

    impl FormatReader for MockPdfReader {
        fn read_pages(&self, _bytes: &[u8]) -> Result<Vec<RawPage>, ExtractionError> {
            Ok(self.pages.clone())
        }
    }

    /// Mock reader simulating a parser crash.
    struct FailingPdfReader;

    impl FormatReader for FailingPdfReader {
        fn read_pages(&self, _bytes: &[u8]) -> Result<Vec<RawPage>, ExtractionError> {
            Err(ExtractionError::CorruptFile("PDF parser aborted".into()))
        }
    }

    fn id() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn extract_plain_text() {
        let extractor = DocumentExtractor::new();
        let result = extractor
            .extract(
                &id(),
                Some(SourceFormat::PlainText),
                "txt",
                b"Acme Corp was founded in 2019.\r\n\r\nThe team has 12 engineers.",
            )
            .unwrap();

        assert_eq!(result.method, ExtractionMethod::PlainTextRead);
        assert_eq!(
            result.text,
            "Acme Corp was founded in 2019.\n\nThe team has 12 engineers."
        );
        assert_eq!(result.paragraph_count(), 2);
        assert_eq!(result.page_count, None);
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = DocumentExtractor::new();
        let bytes = b"Line one\n\n\n  Line   two  \n";
        let a = extractor.extract(&id(), Some(SourceFormat::PlainText), "txt", bytes).unwrap();
        let b = extractor.extract(&id(), Some(SourceFormat::PlainText), "txt", bytes).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unsupported_label_is_reported() {
        let err = DocumentExtractor::new()
            .extract(&id(), None, "pptx", b"whatever")
            .unwrap_err();
        assert_eq!(err, ExtractionError::UnsupportedFormat("pptx".into()));
    }

    #[test]
    fn declared_pdf_with_text_bytes_is_corrupt() {
        let err = DocumentExtractor::new()
            .extract(&id(), Some(SourceFormat::Pdf), "pdf", b"not a pdf at all")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptFile(msg) if msg.contains("declared pdf")));
    }

    #[test]
    fn pdf_pages_keep_page_numbers() {
        let extractor = DocumentExtractor::new().with_pdf_reader(Box::new(MockPdfReader {
            pages: vec![
                RawPage { page_number: Some(1), text: "Market overview".into() },
                RawPage { page_number: Some(2), text: "Technology stack".into() },
            ],
        }));
        let result = extractor
            .extract(&id(), Some(SourceFormat::Pdf), "pdf", b"%PDF-1.4 mock")
            .unwrap();

        assert_eq!(result.page_count, Some(2));
        let tech_start = result.text.find("Technology").unwrap();
        assert_eq!(result.location_at(tech_start).page, Some(2));
    }

    #[test]
    fn pdf_without_text_layer_is_corrupt() {
        let extractor = DocumentExtractor::new().with_pdf_reader(Box::new(MockPdfReader {
            pages: vec![RawPage { page_number: Some(1), text: "   \n".into() }],
        }));
        let err = extractor
            .extract(&id(), Some(SourceFormat::Pdf), "pdf", b"%PDF-1.4 scanned")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptFile(_)));
    }

    #[test]
    fn reader_failure_propagates() {
        let extractor = DocumentExtractor::new().with_pdf_reader(Box::new(FailingPdfReader));
        let err = extractor
            .extract(&id(), Some(SourceFormat::Pdf), "pdf", b"%PDF-1.4 broken")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptFile(_)));
    }

    #[test]
    fn real_pdf_extracts() {
        let bytes = make_test_pdf(&["Hello World from Acme"]);
        let result = DocumentExtractor::new()
            .extract(&id(), Some(SourceFormat::Pdf), "application/pdf", &bytes)
            .unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfTextLayer);
        assert!(result.text.contains("Hello") || result.text.contains("World"));
    }

    #[test]
    fn docx_extracts_paragraphs() {
        let bytes = make_docx(&["Founders: two ex-Google engineers.", "Seed round closed."]);
        let result = DocumentExtractor::new()
            .extract(&id(), Some(SourceFormat::Docx), "docx", &bytes)
            .unwrap();
        assert_eq!(result.method, ExtractionMethod::DocxBody);
        assert_eq!(
            result.text,
            "Founders: two ex-Google engineers.\n\nSeed round closed."
        );
    }
}
