//! HTTP tests for the upload service

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use lopdf::{dictionary, Object};
use pretty_assertions::assert_eq;
use server::{app, AppConfig, AppState, ErrorResponse, UploadResponse};
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "----qrstamp-boundary----";

/// One multipart/form-data part
struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    fn pdf(data: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some("report.pdf"),
            content_type: Some("application/pdf"),
            data,
        }
    }
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload-pdf")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn create_test_pdf(pages: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {},
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => pages as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

struct TestApp {
    dir: TempDir,
    config: AppConfig,
    router: Router,
}

fn test_app_with_limit(max_upload_bytes: usize) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::new(dir.path(), max_upload_bytes);
    config.ensure_dirs().unwrap();
    let router = app(AppState::new(config.clone()));
    TestApp {
        dir,
        config,
        router,
    }
}

fn test_app() -> TestApp {
    test_app_with_limit(10 * 1024 * 1024)
}

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn error_detail(response: axum::response::Response) -> String {
    let error: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    error.detail
}

#[tokio::test]
async fn test_health_check() {
    let t = test_app();

    let response = t
        .router
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_index_form() {
    let t = test_app();

    let response = t
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("dir=\"rtl\""));
    assert!(html.contains("/upload-pdf"));
}

#[tokio::test]
async fn test_upload_stamps_pdf() {
    let t = test_app();
    let pdf = create_test_pdf(2);

    let response = t
        .router
        .clone()
        .oneshot(upload_request(&[Part::pdf(&pdf)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let upload: UploadResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(upload.message, "تم رفع الملف وختمه بالباركود");
    assert_eq!(upload.download_url, format!("/files/{}", upload.filename));
    assert!(upload.filename.ends_with("_stamped.pdf"));
    // <32 hex digits>_stamped.pdf
    assert_eq!(upload.filename.len(), 32 + "_stamped.pdf".len());

    // Upload kept under its generated name, QR image cleaned up
    let stem = upload.filename.trim_end_matches("_stamped.pdf");
    assert_eq!(file_names(&t.config.upload_dir), vec![format!("{stem}.pdf")]);
    assert_eq!(file_names(&t.config.output_dir), vec![upload.filename.clone()]);

    let stamped = std::fs::read(t.config.output_dir.join(&upload.filename)).unwrap();
    let doc = lopdf::Document::load_mem(&stamped).unwrap();
    assert_eq!(doc.get_pages().len(), 2);

    // Stamped file is downloadable
    let response = t
        .router
        .oneshot(
            Request::builder()
                .uri(&upload.download_url)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, stamped);
}

#[tokio::test]
async fn test_upload_accepts_octet_stream_and_uppercase_extension() {
    let t = test_app();
    let pdf = create_test_pdf(1);
    let part = Part {
        name: "file",
        filename: Some("SCAN.PDF"),
        content_type: Some("application/octet-stream"),
        data: &pdf,
    };

    let response = t.router.oneshot(upload_request(&[part])).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_skips_other_fields() {
    let t = test_app();
    let pdf = create_test_pdf(1);
    let note = Part {
        name: "note",
        filename: None,
        content_type: None,
        data: b"hello",
    };

    let response = t
        .router
        .oneshot(upload_request(&[note, Part::pdf(&pdf)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_missing_file_field() {
    let t = test_app();
    let other = Part {
        name: "document",
        ..Part::pdf(b"%PDF-1.5")
    };

    let response = t.router.oneshot(upload_request(&[other])).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_detail(response).await, "Field 'file' is required");
}

#[tokio::test]
async fn test_upload_rejects_content_type() {
    let t = test_app();
    let part = Part {
        content_type: Some("text/plain"),
        ..Part::pdf(b"%PDF-1.5")
    };

    let response = t.router.oneshot(upload_request(&[part])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_detail(response).await,
        "Content-Type must be application/pdf"
    );
    assert!(file_names(&t.config.upload_dir).is_empty());
}

#[tokio::test]
async fn test_upload_rejects_missing_filename() {
    let t = test_app();
    let part = Part {
        filename: Some(""),
        ..Part::pdf(b"%PDF-1.5")
    };

    let response = t.router.oneshot(upload_request(&[part])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "File must have a filename");
}

#[tokio::test]
async fn test_upload_rejects_extension() {
    let t = test_app();
    let part = Part {
        filename: Some("report.docx"),
        ..Part::pdf(b"%PDF-1.5")
    };

    let response = t.router.oneshot(upload_request(&[part])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_detail(response).await, "Only PDF files are allowed");
    assert!(file_names(&t.config.upload_dir).is_empty());
}

#[tokio::test]
async fn test_upload_unreadable_pdf() {
    let t = test_app();

    let response = t
        .router
        .oneshot(upload_request(&[Part::pdf(b"definitely not a pdf")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_detail(response).await.contains("PDF"));
    // No stamped output, no leftover QR image
    assert!(file_names(&t.config.output_dir).is_empty());
}

#[tokio::test]
async fn test_upload_too_large() {
    let t = test_app_with_limit(1024);
    let big = vec![b'x'; 64 * 1024];

    let response = t
        .router
        .oneshot(upload_request(&[Part::pdf(&big)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    // Partial upload removed
    assert!(file_names(&t.config.upload_dir).is_empty());
    drop(t.dir);
}

#[tokio::test]
async fn test_missing_download() {
    let t = test_app();

    let response = t
        .router
        .oneshot(
            Request::builder()
                .uri("/files/nothing_stamped.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
