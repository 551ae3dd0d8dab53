//! Extractor: turns an uploaded PDF or DOCX into ordered page texts.
//!
//! Each format has an ordered list of strategies. They are tried in priority
//! order and the first one that yields a non-blank page wins. A strategy that
//! succeeds with only blank pages is remembered and returned if nothing later
//! does better; only when every strategy fails is an `ExtractionError` raised.

pub mod docx;
pub mod pdf;

use tracing::{debug, info, warn};

use crate::errors::ExtractionError;
use crate::models::document::{Document, DocumentFormat, Page};

/// One way of reading raw text out of a document, one string per page.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, bytes: &[u8]) -> anyhow::Result<Vec<String>>;
}

pub struct Extractor {
    pdf: Vec<Box<dyn ExtractionStrategy>>,
    docx: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_strategies(
            vec![
                Box::new(pdf::LayoutPdfStrategy),
                Box::new(pdf::PlainPdfStrategy),
            ],
            vec![Box::new(docx::DocxParagraphStrategy)],
        )
    }
}

impl Extractor {
    pub fn with_strategies(
        pdf: Vec<Box<dyn ExtractionStrategy>>,
        docx: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Self {
        Self { pdf, docx }
    }

    fn strategies_for(&self, format: DocumentFormat) -> &[Box<dyn ExtractionStrategy>] {
        match format {
            DocumentFormat::Pdf => &self.pdf,
            DocumentFormat::Docx => &self.docx,
        }
    }

    /// Consumes the document and returns its pages in source order, with tabs
    /// normalized to single spaces.
    pub fn extract(&self, document: Document) -> Result<Vec<Page>, ExtractionError> {
        let format = document.format;
        let mut failures: Vec<String> = Vec::new();
        let mut blank: Option<(&'static str, Vec<String>)> = None;

        for strategy in self.strategies_for(format) {
            match strategy.extract(&document.bytes) {
                Ok(pages) if pages.iter().any(|p| !p.trim().is_empty()) => {
                    info!(
                        "Extracted {} pages from '{}' using {}",
                        pages.len(),
                        document.filename,
                        strategy.name()
                    );
                    return Ok(into_pages(pages));
                }
                Ok(pages) => {
                    debug!(
                        "{} returned no text for '{}', trying next strategy",
                        strategy.name(),
                        document.filename
                    );
                    blank = Some((strategy.name(), pages));
                }
                Err(e) => {
                    warn!(
                        "{} failed for '{}': {e:#}",
                        strategy.name(),
                        document.filename
                    );
                    failures.push(format!("{}: {e:#}", strategy.name()));
                }
            }
        }

        if let Some((name, pages)) = blank {
            warn!(
                "No text found in '{}'; returning {} blank pages from {name}",
                document.filename,
                pages.len()
            );
            return Ok(into_pages(pages));
        }

        let cause = if failures.is_empty() {
            "no extraction strategy configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(ExtractionError { format, cause })
    }
}

/// Tabs become single spaces, for every format.
pub fn normalize_text(text: &str) -> String {
    text.replace('\t', " ")
}

fn into_pages(texts: Vec<String>) -> Vec<Page> {
    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Page {
            index,
            text: normalize_text(&text),
        })
        .collect()
}
