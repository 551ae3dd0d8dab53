use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::document::DocumentFormat;

/// One `##` section of the final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
}

/// Everything the caller receives for one analyzed document.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub format: DocumentFormat,
    pub page_count: usize,
    pub segment_count: usize,
    pub final_answer: String,
    pub steps: Vec<String>,
    pub sections: Vec<ReportSection>,
    pub completed_at: DateTime<Utc>,
}

/// Splits markdown on `##` markers. The first line of each chunk is the title,
/// the rest is the body. Blank chunks are dropped.
pub fn split_sections(answer: &str) -> Vec<ReportSection> {
    answer
        .split("##")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let (title, body) = chunk.split_once('\n').unwrap_or((chunk, ""));
            ReportSection {
                title: title.trim_start_matches('#').trim().to_string(),
                body: body.trim().to_string(),
            }
        })
        .collect()
}
