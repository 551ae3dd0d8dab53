use std::any::Any;
use std::panic;

use anyhow::{anyhow, Context, Result};
use lopdf::Document as PdfDocument;

use super::ExtractionStrategy;

/// Layout-aware extraction via `pdf-extract`: follows text positioning and
/// font metrics, so columns and line breaks survive. Tried first.
pub struct LayoutPdfStrategy;

/// Plain content-stream extraction via `lopdf`. Less faithful to layout, but
/// tolerates PDFs whose fonts `pdf-extract` cannot decode.
pub struct PlainPdfStrategy;

impl ExtractionStrategy for LayoutPdfStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>> {
        // pdf-extract panics on some malformed inputs; treat that as a failure.
        panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|payload| anyhow!("parser panicked: {}", panic_message(payload.as_ref())))?
            .map_err(|e| anyhow!("{e}"))
    }
}

impl ExtractionStrategy for PlainPdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, bytes: &[u8]) -> Result<Vec<String>> {
        let doc = PdfDocument::load_mem(bytes).context("failed to parse PDF")?;

        doc.get_pages()
            .keys()
            .map(|&number| {
                doc.extract_text(&[number])
                    .with_context(|| format!("failed to read text of page {number}"))
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a minimal PDF with one Courier text line per page.
    pub fn pdf_with_pages(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content stream"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize pdf");
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::pdf_with_pages;
    use super::*;

    #[test]
    fn test_plain_strategy_reads_pages_in_order() {
        let bytes = pdf_with_pages(&["Jane Doe", "Staff Engineer"]);
        let pages = PlainPdfStrategy.extract(&bytes).unwrap();

        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("Jane Doe"));
        assert!(pages[1].contains("Staff Engineer"));
    }

    #[test]
    fn test_plain_strategy_rejects_non_pdf() {
        let err = PlainPdfStrategy.extract(b"hello").unwrap_err();
        assert!(err.to_string().contains("failed to parse PDF"));
    }

    #[test]
    fn test_layout_strategy_never_panics_on_garbage() {
        assert!(LayoutPdfStrategy.extract(b"%PDF-1.7 truncated").is_err());
    }

    #[test]
    fn test_panic_message_from_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }
}
