use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::Method,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::Config,
    error::AppError,
    services::sheet::{parser, remap, FileKind},
    AppState,
};

const ALLOWED_MIME_TYPES: &[(&str, FileKind)] = &[
    ("text/csv", FileKind::Csv),
    ("application/vnd.ms-excel", FileKind::Excel),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        FileKind::Excel,
    ),
];

pub fn routes(config: &Config) -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/api/convert", post(convert_file))
        .layer(DefaultBodyLimit::max(config.max_file_size))
        .layer(cors)
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    success: bool,
    data: Vec<Vec<String>>,
    #[serde(rename = "textContent")]
    text_content: String,
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

#[axum::debug_handler]
async fn convert_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, AppError> {
    let start = std::time::Instant::now();

    let mut upload: Option<(FileKind, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart request: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(|s| s.to_string());
        let file_name = field.file_name().map(|s| s.to_string());
        let kind = detect_file_kind(content_type.as_deref(), file_name.as_deref())?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;
        upload = Some((kind, data));
        break;
    }

    let (kind, data) =
        upload.ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;
    tracing::info!("Received {:?} upload, size: {}KB", kind, data.len() / 1024);

    let grid = parser::parse_grid(data, kind)?;
    let text_content = remap::convert_to_text_format(&state.schema, &grid);

    let rows = if grid.is_empty() {
        Vec::new()
    } else {
        grid[1..].to_vec()
    };
    tracing::info!("Converted {} data rows in {:?}", rows.len(), start.elapsed());

    Ok(Json(ConvertResponse {
        success: true,
        data: grid,
        text_content,
        headers: state.schema.canonical_header().to_vec(),
        rows,
    }))
}

fn detect_file_kind(
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<FileKind, AppError> {
    if let Some(mime) = content_type {
        let mime = mime.to_ascii_lowercase();
        // Strip parameters such as "; charset=utf-8"
        let essence = mime.split(';').next().unwrap_or("").trim();
        if let Some((_, kind)) = ALLOWED_MIME_TYPES.iter().find(|(m, _)| *m == essence) {
            return Ok(*kind);
        }
    }

    if let Some(name) = file_name {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            return Ok(FileKind::Csv);
        }
        if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            return Ok(FileKind::Excel);
        }
    }

    Err(AppError::UnsupportedFileType(
        "Only Excel files (.xlsx, .xls) and CSV files are allowed".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Config {
            max_file_size: 1024 * 1024,
            port: 0,
        };
        let state = Arc::new(AppState::new(config.clone()));
        routes(&config).with_state(state)
    }

    fn multipart_request(
        field_name: &str,
        file_name: &str,
        content_type: &str,
        content: &str,
    ) -> Request<Body> {
        let boundary = "test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/convert")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn converts_multipart_csv_upload() {
        let app = test_app();
        let request = multipart_request(
            "file",
            "list.csv",
            "text/csv",
            "title,addressl,city\r\nMr.,123 Main St,Springfield",
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["headers"].as_array().unwrap().len(), 41);
        assert_eq!(body["headers"][0], "Primary Salutation");
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(
            body["rows"],
            json!([["Mr.", "123 Main St", "Springfield"]])
        );

        let text = body["textContent"].as_str().unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("\"Primary Salutation\""));
        // Canonical order: salutation, street, secondary, city
        let data_line = lines.next().unwrap();
        assert!(data_line.starts_with("\"Mr.\",\"123 Main St\",\"\",\"Springfield\""));
        assert!(lines.next().is_none());
    }

    #[tokio::test]
    async fn empty_upload_returns_empty_text_content() {
        let app = test_app();
        let request = multipart_request("file", "empty.csv", "text/csv", "");
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["textContent"], "");
        assert!(body["data"].as_array().unwrap().is_empty());
        assert!(body["rows"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_part_is_rejected() {
        let app = test_app();
        let request = multipart_request("attachment", "list.csv", "text/csv", "title\r\nMr.");
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn unsupported_upload_type_is_rejected() {
        let app = test_app();
        let request = multipart_request("file", "report.pdf", "application/pdf", "%PDF-1.4");
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert_eq!(
            body["error"],
            "Only Excel files (.xlsx, .xls) and CSV files are allowed"
        );
    }

    #[test]
    fn detects_csv_by_mime() {
        let kind = detect_file_kind(Some("text/csv"), None).unwrap();
        assert_eq!(kind, FileKind::Csv);
    }

    #[test]
    fn detects_csv_with_charset_parameter() {
        let kind = detect_file_kind(Some("text/csv; charset=utf-8"), None).unwrap();
        assert_eq!(kind, FileKind::Csv);
    }

    #[test]
    fn detects_xlsx_by_mime() {
        let kind = detect_file_kind(
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            None,
        )
        .unwrap();
        assert_eq!(kind, FileKind::Excel);
    }

    #[test]
    fn falls_back_to_file_extension() {
        let kind = detect_file_kind(Some("application/octet-stream"), Some("list.CSV")).unwrap();
        assert_eq!(kind, FileKind::Csv);

        let kind = detect_file_kind(None, Some("list.xlsx")).unwrap();
        assert_eq!(kind, FileKind::Excel);
    }

    #[test]
    fn rejects_unsupported_uploads() {
        let err = detect_file_kind(Some("application/pdf"), Some("report.pdf"));
        assert!(matches!(err, Err(AppError::UnsupportedFileType(_))));

        let err = detect_file_kind(None, None);
        assert!(matches!(err, Err(AppError::UnsupportedFileType(_))));
    }
}
