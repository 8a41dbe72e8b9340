use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use docshift::config::Config;
use docshift::db::Database;
use docshift::services::BlobService;
use docshift::{create_router, storage, AppState};

const BOUNDARY: &str = "docshift-test-boundary";

struct TestApp {
    _dir: TempDir,
    state: AppState,
    router: Router,
}

async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.database.path = dir.path().join("test.db").to_string_lossy().into_owned();
    config.storage.blob_path = dir.path().join("blobs").to_string_lossy().into_owned();
    config.storage.work_dir = dir.path().join("work").to_string_lossy().into_owned();

    let db = Database::new(&config.database.path).await.unwrap();
    db.run_migrations().await.unwrap();

    let state = AppState {
        db,
        storage: storage::blob_provider(&config.storage),
        config: Arc::new(config),
    };
    let router = create_router(state.clone());

    TestApp { _dir: dir, state, router }
}

fn multipart_request(uri: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn png_bytes() -> Vec<u8> {
    let mut img = image::RgbaImage::new(2, 2);
    img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
    img.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
    img.put_pixel(1, 1, image::Rgba([0, 255, 0, 255]));

    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn download_id(html: &str) -> String {
    let start = html.find("/download/").expect("download link") + "/download/".len();
    let rest = &html[start..];
    rest[..rest.find('"').unwrap()].to_string()
}

#[tokio::test]
async fn image_upload_can_be_downloaded() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("/convert/jpg-svg", "pixels.png", &png_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("pixels.svg"));
    let id = download_id(&html);

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/download/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("pixels.svg"));

    let downloaded = body_bytes(response).await;
    let stored = BlobService::get_data(&app.state.db, app.state.storage.as_ref(), &id)
        .await
        .unwrap();
    assert_eq!(downloaded, stored.data.to_vec());

    let svg = String::from_utf8(downloaded).unwrap();
    assert!(svg.contains(r#"viewBox="0 0 2 2""#));
    assert_eq!(svg.matches("<rect").count(), 3);
    assert!(svg.contains(r##"<rect x="0" y="0" width="1" height="1" fill="#ff0000"/>"##));
    assert!(svg.contains(r##"<rect x="0" y="1" width="1" height="1" fill="#0000ff"/>"##));
    assert!(svg.contains(r##"<rect x="1" y="1" width="1" height="1" fill="#00ff00"/>"##));
}

#[tokio::test]
async fn malformed_or_unknown_download_is_not_found() {
    let app = test_app().await;

    for uri in [
        "/download/not-an-id",
        "/download/507f1f77bcf86cd799439011",
        "/download/3f2b1c9e-0000-4000-8000-000000000000",
    ] {
        let response = app.router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn disallowed_extension_is_rejected() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("/convert/jpg-svg", "notes.docx", b"PK\x03\x04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["code"], 400);

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("/convert/word-to-pdf", "scan.pdf", b"%PDF-1.4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.router.clone().oneshot(get("/api/v1/conversions")).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn missing_file_part_is_rejected() {
    let app = test_app().await;

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/convert/pdf-to-word")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_shows_converted_files() {
    let app = test_app().await;

    let response = app.router.clone().oneshot(get("/converted-files")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("No converted files yet"));

    let response = app
        .router
        .clone()
        .oneshot(multipart_request("/convert/jpg-svg", "logo.png", &png_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = download_id(&String::from_utf8(body_bytes(response).await).unwrap());

    let response = app.router.clone().oneshot(get("/converted-files")).await.unwrap();
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("logo.png"));
    assert!(html.contains(&format!("/download/{}", id)));

    let response = app.router.clone().oneshot(get("/api/v1/conversions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["blob_id"], id.as_str());
    assert_eq!(records[0]["original_format"], "png");
    assert_eq!(records[0]["converted_format"], "svg");
}

#[tokio::test]
async fn index_and_health() {
    let app = test_app().await;

    let response = app.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("action=\"/convert/pdf-to-word\""));
    assert!(html.contains("action=\"/convert/jpg-svg\""));

    let response = app.router.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["message"], "ok");
}
