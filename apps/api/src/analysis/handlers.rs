use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::models::analysis::AnalysisReport;
use crate::models::document::{Document, DocumentFormat};
use crate::state::AppState;

struct Upload {
    filename: String,
    bytes: Bytes,
    target_job: Option<String>,
}

/// POST /api/v1/analysis
///
/// Multipart body: `file` (a .pdf or .docx upload) and optional `target_job`.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError> {
    let upload = read_upload(&mut multipart).await?;

    let format = DocumentFormat::from_filename(&upload.filename).ok_or_else(|| {
        AppError::Validation(format!(
            "Unsupported file type for '{}': upload a .pdf or .docx file",
            upload.filename
        ))
    })?;

    let document = Document::new(upload.filename, format, upload.bytes);
    let report = state
        .pipeline
        .analyze(document, upload.target_job.as_deref())
        .await?;

    if report.segment_count == 0 {
        return Err(AppError::UnprocessableEntity(
            "No text could be extracted from the uploaded document".to_string(),
        ));
    }

    info!(
        "Analysis {} returned {} sections",
        report.run_id,
        report.sections.len()
    );
    Ok(Json(report))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut target_job: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Invalid multipart body", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("File field has no filename".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read upload", e))?;
                file = Some((filename, bytes));
            }
            Some("target_job") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error("Invalid target_job", e))?;
                target_job = Some(text);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::Validation(format!("'{filename}' is empty")));
    }

    Ok(Upload {
        filename,
        bytes,
        target_job,
    })
}

/// Body-limit overruns keep their 413; every other multipart failure is a
/// client validation error.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: {}", err.body_text()))
    } else {
        AppError::Validation(format!("{context}: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::analysis::AnalysisPipeline;
    use crate::extraction::docx::fixtures::docx_with_paragraphs;
    use crate::extraction::pdf::fixtures::pdf_with_pages;
    use crate::extraction::Extractor;
    use crate::llm_client::stub::ScriptedGenerator;
    use crate::llm_client::{Generator, LlmError};
    use crate::refine::{RefineAccumulator, RefineOptions};
    use crate::routes::build_router;
    use crate::segmentation::Segmenter;
    use crate::state::AppState;

    const BOUNDARY: &str = "analysis-test-boundary";

    fn app(generator: Arc<dyn Generator>, max_upload_bytes: usize) -> Router {
        let options = RefineOptions {
            step_timeout: Duration::from_secs(5),
            max_attempts: 1,
            retry_backoff: Duration::ZERO,
        };
        let pipeline = AnalysisPipeline::new(
            Extractor::default(),
            Segmenter::with_default_separators(1500, 200).unwrap(),
            RefineAccumulator::with_default_templates(options).unwrap(),
            generator,
            Duration::from_secs(10),
        );
        build_router(AppState {
            pipeline: Arc::new(pipeline),
            max_upload_bytes,
        })
    }

    fn multipart_body(filename: &str, bytes: &[u8], target_job: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
        if let Some(job) = target_job {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"target_job\"\r\n\r\n{job}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/analysis")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_docx_upload_returns_report() {
        let generator = Arc::new(ScriptedGenerator::new(|_, _| {
            Ok("## Overview\nStrong Rust background.\n## Recommendations\nQuantify impact.".to_string())
        }));
        let docx = docx_with_paragraphs(&["Jane Doe", "Senior Rust Engineer"]);

        let response = app(generator.clone(), 1024 * 1024)
            .oneshot(upload_request(multipart_body(
                "jane.docx",
                &docx,
                Some("Platform Engineer"),
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["format"], "docx");
        assert_eq!(body["segment_count"], 1);
        assert_eq!(body["sections"][0]["title"], "Overview");
        assert_eq!(body["sections"][2]["title"], "Target Job Analysis");
        assert_eq!(generator.calls(), 1);
        assert!(generator.prompts()[0].contains("Senior Rust Engineer"));
    }

    #[tokio::test]
    async fn test_pdf_upload_is_extracted() {
        let generator = Arc::new(ScriptedGenerator::echo());
        let pdf = pdf_with_pages(&["Jane Doe Resume"]);

        let response = app(generator.clone(), 1024 * 1024)
            .oneshot(upload_request(multipart_body("CV.PDF", &pdf, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["format"], "pdf");
        assert_eq!(body["page_count"], 1);
        assert!(generator.prompts()[0].contains("Jane Doe Resume"));
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_validation_error() {
        let generator = Arc::new(ScriptedGenerator::echo());

        let response = app(generator.clone(), 1024)
            .oneshot(upload_request(multipart_body("resume.txt", b"hello", None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_field_is_validation_error() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"target_job\"\r\n\r\nSRE\r\n--{BOUNDARY}--\r\n"
        );

        let response = app(Arc::new(ScriptedGenerator::echo()), 1024)
            .oneshot(upload_request(body.into_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Missing 'file' field");
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_extraction_error() {
        let response = app(Arc::new(ScriptedGenerator::echo()), 1024)
            .oneshot(upload_request(multipart_body("cv.pdf", b"not a pdf", None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "EXTRACTION_ERROR");
    }

    #[tokio::test]
    async fn test_document_without_text_is_unprocessable() {
        let docx = docx_with_paragraphs(&[""]);

        let response = app(Arc::new(ScriptedGenerator::echo()), 1024 * 1024)
            .oneshot(upload_request(multipart_body("blank.docx", &docx, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_generation_failure_is_bad_gateway() {
        let generator = Arc::new(ScriptedGenerator::new(|_, _| {
            Err(LlmError::Api {
                status: 401,
                message: "invalid x-api-key".to_string(),
            })
        }));
        let docx = docx_with_paragraphs(&["Jane Doe"]);

        let response = app(generator, 1024 * 1024)
            .oneshot(upload_request(multipart_body("jane.docx", &docx, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["details"]["segment_index"], 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let generator = Arc::new(ScriptedGenerator::echo());
        let big = vec![b'x'; 4096];

        let response = app(generator.clone(), 1024)
            .oneshot(upload_request(multipart_body("big.pdf", &big, None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(generator.calls(), 0);
    }
}
