use std::panic::{catch_unwind, AssertUnwindSafe};

use super::types::{FormatReader, RawPage};
use super::ExtractionError;

/// PDF text-layer reader using the pdf-extract crate.
/// Scanned PDFs without a text layer yield empty pages.
pub struct PdfTextReader;

impl FormatReader for PdfTextReader {
    fn read_pages(&self, bytes: &[u8]) -> Result<Vec<RawPage>, ExtractionError> {
        // pdf-extract panics on some malformed inputs.
        let result = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|_| ExtractionError::CorruptFile("PDF parser aborted".into()))?;

        let page_texts =
            result.map_err(|e| ExtractionError::CorruptFile(format!("PDF parsing: {e}")))?;

        let pages = page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| RawPage {
                page_number: Some(i as u32 + 1),
                text,
            })
            .collect();

        Ok(pages)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a PDF with one text line per page using lopdf.
    pub(crate) fn make_test_pdf(page_texts: &[&str]) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn reads_text_layer() {
        let bytes = make_test_pdf(&["Hello World from Acme"]);
        let pages = PdfTextReader.read_pages(&bytes).unwrap();

        assert!(!pages.is_empty());
        let full: String = pages.iter().map(|p| p.text.clone()).collect();
        assert!(
            full.contains("Hello") || full.contains("World"),
            "Expected extracted text, got: {full}"
        );
    }

    #[test]
    fn pages_are_numbered_from_one() {
        let bytes = make_test_pdf(&["First page", "Second page"]);
        let pages = PdfTextReader.read_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, Some(1));
        assert_eq!(pages[1].page_number, Some(2));
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = PdfTextReader.read_pages(b"%PDF-1.4 this is not really a pdf").unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptFile(_)));
    }
}
