use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{error, info, warn};

use crate::config::Config;
use crate::constants;
use crate::error::{AppError, AppResult};
use crate::models::{Block, ExamDraft, ParseBlocksRequest, ParseQuery, ParseReport};
use crate::services::validation::validate_draft;
use crate::services::{extractor_for, parse_exam};

/// Recognize an uploaded document sent as the raw request body
pub async fn parse_exam_upload(
    query: web::Query<ParseQuery>,
    body: web::Bytes,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    if body.is_empty() {
        return Err(AppError::BadRequest("Empty upload".to_string()));
    }

    let filename = query
        .filename
        .clone()
        .unwrap_or_else(|| format!("upload.{}", constants::SUPPORTED_EXTENSIONS[0]));

    let extractor = extractor_for(&filename);
    info!(
        "Parsing '{}' ({} bytes) with the {} extractor",
        filename,
        body.len(),
        extractor.extractor_id()
    );

    let blocks = extractor.extract(&body).await.map_err(|e| {
        error!("Failed to extract blocks from '{}': {}", filename, e);
        AppError::from(e)
    })?;

    let report = build_report(&filename, &blocks, &config);
    Ok(HttpResponse::Ok().json(report))
}

/// Recognize blocks already produced by an external converter
pub async fn parse_blocks(
    request: web::Json<ParseBlocksRequest>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let request = request.into_inner();
    if request.blocks.is_empty() {
        warn!("parse-blocks called with no blocks for '{}'", request.filename);
    }

    let blocks: Vec<Block> = request
        .blocks
        .into_iter()
        .map(Block::normalized)
        .collect();

    let report = build_report(&request.filename, &blocks, &config);
    Ok(HttpResponse::Ok().json(report))
}

/// Run the recognizer and attach review warnings.
pub fn build_report(source: &str, blocks: &[Block], config: &Config) -> ParseReport {
    let draft: ExamDraft = parse_exam(blocks, source, &config.recognizer);
    let validation = validate_draft(&draft, &config.recognizer);
    if !validation.is_valid {
        // recognizer output always satisfies the contract
        error!("Draft for '{}' failed validation: {:?}", source, validation.errors);
    }

    ParseReport {
        source: source.to_string(),
        parsed_at: Utc::now(),
        question_count: draft.questions.len(),
        warnings: validation.messages(),
        draft,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure_api;
    use actix_web::{http::StatusCode, test, App};

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_upload_bytes: 1024 * 1024,
            recognizer: Default::default(),
        }
    }

    fn blocks_json() -> String {
        serde_json::json!([
            { "plainText": "Thời gian: 15 phút", "markup": "Thời gian: 15 phút" },
            { "plainText": "Câu 1: Tính 2 + 2", "markup": "<b>Câu 1:</b> Tính 2 + 2" },
            { "plainText": "A. 3 B. 4 C. 5 D. 6", "markup": "A. 3 B. 4 C. 5 D. 6" },
            { "plainText": "Lời giải", "markup": "Lời giải" },
            { "plainText": "Chọn B", "markup": "Chọn B" }
        ])
        .to_string()
    }

    #[actix_web::test]
    async fn test_parse_upload_json_blocks() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/exams/parse?filename=de-so-1.json")
            .set_payload(blocks_json())
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp["source"], "de-so-1.json");
        assert_eq!(resp["questionCount"], 1);
        assert_eq!(resp["draft"]["title"], "de-so-1");
        assert_eq!(resp["draft"]["durationMinutes"], 15);
        assert_eq!(resp["draft"]["questions"][0]["text"], "Tính 2 + 2");
        assert_eq!(resp["draft"]["answers"][0]["correctOptionId"], "B");
    }

    #[actix_web::test]
    async fn test_empty_upload_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/exams/parse?filename=de.docx")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unreadable_docx_is_unprocessable() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/exams/parse?filename=de.docx")
            .set_payload("definitely not a zip archive")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_parse_blocks_reports_warnings() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .configure(configure_api),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/exams/parse-blocks")
            .set_json(serde_json::json!({
                "filename": "",
                "blocks": [
                    { "plainText": "ĐỀ KIỂM TRA HỌC KỲ", "markup": "ĐỀ KIỂM TRA HỌC KỲ" },
                    { "plainText": "Câu 1: Không có đáp án", "markup": "Câu 1: Không có đáp án" }
                ]
            }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp["draft"]["title"], "ĐỀ KIỂM TRA HỌC KỲ");
        assert_eq!(resp["draft"]["answers"][0]["correctOptionId"], "A");
        let warnings = resp["warnings"].as_array().unwrap();
        assert!(warnings.iter().any(|w| w.as_str().unwrap().starts_with("[PLACEHOLDER_OPTIONS]")));
        assert!(warnings.iter().any(|w| w.as_str().unwrap().starts_with("[MISSING_SOLUTION]")));
    }

    #[actix_web::test]
    async fn test_image_only_block_kept_by_both_endpoints() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .configure(configure_api),
        )
        .await;

        let blocks = serde_json::json!([
            { "plainText": "Câu 1: Quan sát", "markup": "Câu 1: Quan sát" },
            { "plainText": "", "markup": "<svg><path d='M0 0'/></svg>", "hasImage": true }
        ]);

        let req = test::TestRequest::post()
            .uri("/api/exams/parse?filename=hinh.json")
            .set_payload(blocks.to_string())
            .to_request();
        let from_upload: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/exams/parse-blocks")
            .set_json(serde_json::json!({ "filename": "hinh.json", "blocks": blocks }))
            .to_request();
        let from_blocks: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let text = &from_upload["draft"]["questions"][0]["text"];
        assert!(text.as_str().unwrap().contains("<svg>"));
        assert_eq!(&from_blocks["draft"]["questions"][0]["text"], text);
    }

    #[actix_web::test]
    async fn test_healthz() {
        let app = test::init_service(App::new().configure(configure_api)).await;
        let req = test::TestRequest::get().uri("/healthz").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "OK");
    }
}
