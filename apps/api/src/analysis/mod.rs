//! Resume analysis: runs one uploaded document through the full pipeline.
//!
//! Flow: extract (blocking pool, bounded) → segment → refine once → report.
//! Every dependency is injected at construction; nothing here is global, and
//! each call to `analyze` owns its refine state.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{ExtractionError, PipelineError};
use crate::extraction::Extractor;
use crate::llm_client::Generator;
use crate::models::analysis::{split_sections, AnalysisReport};
use crate::models::document::{Document, Page};
use crate::refine::RefineAccumulator;
use crate::segmentation::Segmenter;

pub struct AnalysisPipeline {
    extractor: Arc<Extractor>,
    segmenter: Segmenter,
    accumulator: RefineAccumulator,
    generator: Arc<dyn Generator>,
    extraction_timeout: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        extractor: Extractor,
        segmenter: Segmenter,
        accumulator: RefineAccumulator,
        generator: Arc<dyn Generator>,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            segmenter,
            accumulator,
            generator,
            extraction_timeout,
        }
    }

    /// Analyzes one document. The refine chain runs exactly once.
    pub async fn analyze(
        &self,
        document: Document,
        target_job: Option<&str>,
    ) -> Result<AnalysisReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let format = document.format;
        info!(
            "Analysis {run_id}: '{}' ({}, {} bytes)",
            document.filename,
            format,
            document.bytes.len()
        );

        let pages = self.extract(document).await?;
        for page in &pages {
            debug!(
                "Analysis {run_id}: page {} has {} chars",
                page.index,
                page.text.chars().count()
            );
        }

        let segments = if pages.iter().all(Page::is_blank) {
            Vec::new()
        } else {
            self.segmenter.segment(&pages)
        };
        info!(
            "Analysis {run_id}: {} pages, {} segments (longest {} chars)",
            pages.len(),
            segments.len(),
            segments.iter().map(|s| s.char_len()).max().unwrap_or(0)
        );

        let outcome = self
            .accumulator
            .run(&segments, self.generator.as_ref())
            .await?;

        let mut final_answer = outcome.final_answer;
        append_target_job(&mut final_answer, target_job);

        info!("Analysis {run_id}: complete");

        Ok(AnalysisReport {
            run_id,
            format,
            page_count: pages.len(),
            segment_count: segments.len(),
            sections: split_sections(&final_answer),
            final_answer,
            steps: outcome.steps,
            completed_at: Utc::now(),
        })
    }

    /// PDF and DOCX parsing is CPU-bound, so it runs on the blocking pool.
    async fn extract(&self, document: Document) -> Result<Vec<Page>, PipelineError> {
        let format = document.format;
        let extractor = Arc::clone(&self.extractor);

        let joined = tokio::time::timeout(
            self.extraction_timeout,
            tokio::task::spawn_blocking(move || extractor.extract(document)),
        )
        .await
        .map_err(|_| ExtractionError {
            format,
            cause: format!(
                "extraction timed out after {}s",
                self.extraction_timeout.as_secs_f32()
            ),
        })?;

        let pages = joined??;
        Ok(pages)
    }
}

/// Adds the target-job note to the end of the analysis.
fn append_target_job(answer: &mut String, target_job: Option<&str>) {
    if let Some(job) = target_job.map(str::trim).filter(|j| !j.is_empty()) {
        answer.push_str("\n\n## Target Job Analysis\nAdditional analysis for target job: ");
        answer.push_str(job);
    }
}
