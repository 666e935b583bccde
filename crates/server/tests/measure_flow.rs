use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use server::{routes, startup};
use service::vision::mock::StaticMeterReader;
use service::vision::MeterReader;

const JPEG: [u8; 10] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn cors() -> tower_http::cors::CorsLayer { tower_http::cors::CorsLayer::very_permissive() }

async fn build_app(reader: impl MeterReader + 'static) -> anyhow::Result<Router> {
    let mut cfg = configs::AppConfig::default();
    cfg.database.url = "sqlite::memory:".into();
    cfg.links.secret = "integration-secret".into();
    cfg.storage.image_dir = std::env::temp_dir()
        .join(format!("meter-reader-it-{}", Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    cfg.server.public_base_url = Some("http://meter.test".into());

    let db = models::db::connect_with_config(&(&cfg.database).into()).await?;
    migration::Migrator::up(&db, None).await?;
    let state = startup::build_state(&cfg, db, Arc::new(reader));
    Ok(routes::build_router(state, cors()))
}

async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<(StatusCode, Vec<u8>)> {
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> anyhow::Result<(StatusCode, Value)> {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?;
    let (status, bytes) = send(app, req).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

async fn get_json(app: &Router, uri: &str) -> anyhow::Result<(StatusCode, Value)> {
    let (status, bytes) = send(app, Request::builder().uri(uri).body(Body::empty())?).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn upload_body(customer: &str, measure_type: &str, datetime: &str) -> Value {
    json!({
        "image": STANDARD.encode(JPEG),
        "customer_code": customer,
        "measure_datetime": datetime,
        "measure_type": measure_type
    })
}

/// Path and query of a signed link, relative to the server.
fn local_path(image_url: &str) -> &str {
    image_url.strip_prefix("http://meter.test").unwrap()
}

#[tokio::test]
async fn test_upload_confirm_list_flow() -> anyhow::Result<()> {
    let app = build_app(StaticMeterReader::text("Reading: 1234 m³")).await?;

    let (status, body) = send_json(&app, "POST", "/upload", upload_body("C1", "WATER", "2024-05-10T12:00:00Z")).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["measure_value"], 1234);
    let uuid = body["measure_uuid"].as_str().unwrap().to_string();
    let image_url = body["image_url"].as_str().unwrap().to_string();
    assert!(image_url.starts_with("http://meter.test/temp_images/temp_image_"));

    // the signed link serves the stored bytes
    let (status, bytes) = send(&app, Request::builder().uri(local_path(&image_url)).body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, JPEG);

    let (status, body) = send_json(&app, "POST", "/upload", upload_body("C1", "WATER", "2024-05-28")).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "DOUBLE_REPORT");

    let (status, body) = send_json(&app, "PATCH", "/confirm", json!({ "measure_uuid": uuid, "measure_value": 1300.0 })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = send_json(&app, "PATCH", "/confirm", json!({ "measure_uuid": uuid, "measure_value": 1 })).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "ALREADY_CONFIRMED");

    let (status, body) = get_json(&app, "/C1/list").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer_code"], "C1");
    let measures = body["measures"].as_array().unwrap();
    assert_eq!(measures.len(), 1);
    assert_eq!(measures[0]["uuid"], uuid.as_str());
    assert!(measures[0].get("measure_uuid").is_none());
    assert_eq!(measures[0]["measure_type"], "WATER");
    assert_eq!(measures[0]["has_confirmed"], true);
    assert!(measures[0]["image_url"].as_str().unwrap().contains("?token="));
    Ok(())
}

#[tokio::test]
async fn test_upload_validation_errors() -> anyhow::Result<()> {
    let app = build_app(StaticMeterReader::text("1")).await?;

    let (status, body) = send_json(&app, "POST", "/upload", json!({ "customer_code": "C1" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_DATA");
    let description = body["error_description"].as_str().unwrap();
    assert!(description.contains("image is required"));
    assert!(description.contains("measure_type is required"));
    assert!(!description.contains("customer_code"));

    let (status, body) = send_json(&app, "POST", "/upload", upload_body("C1", "water", "2024-05-10")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_DATA");

    // malformed JSON gets the same error shape
    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let (status, bytes) = send(&app, req).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["error_code"], "INVALID_DATA");
    Ok(())
}

#[tokio::test]
async fn test_failed_extraction_still_creates_reading() -> anyhow::Result<()> {
    let app = build_app(StaticMeterReader::failing("connection refused")).await?;
    let (status, body) = send_json(&app, "POST", "/upload", upload_body("C7", "GAS", "2024-02-29")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["measure_value"], -1);

    let (status, body) = get_json(&app, "/C7/list?measure_type=gas").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["measures"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_confirm_and_list_errors() -> anyhow::Result<()> {
    let app = build_app(StaticMeterReader::text("5")).await?;

    let (status, body) = send_json(&app, "PATCH", "/confirm", json!({ "measure_uuid": Uuid::new_v4(), "measure_value": 3 })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "MEASURE_NOT_FOUND");

    let (status, body) = send_json(&app, "PATCH", "/confirm", json!({ "measure_uuid": "x", "measure_value": "3" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_DATA");

    let (status, body) = get_json(&app, "/nobody/list").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "MEASURES_NOT_FOUND");

    let (status, body) = get_json(&app, "/nobody/list?measure_type=STEAM").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_DATA");
    Ok(())
}

#[tokio::test]
async fn test_list_rejects_malformed_path_and_query() -> anyhow::Result<()> {
    let app = build_app(StaticMeterReader::text("5")).await?;

    for uri in ["/C1/list?measure_type=GAS&measure_type=WATER", "/%FF/list"] {
        let (status, bytes) = send(&app, Request::builder().uri(uri).body(Body::empty())?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        let body: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["error_code"], "INVALID_DATA", "{uri}");
        assert!(body["error_description"].is_string());
    }
    Ok(())
}

#[tokio::test]
async fn test_image_link_requires_valid_token() -> anyhow::Result<()> {
    let app = build_app(StaticMeterReader::text("5")).await?;
    let (_, body) = send_json(&app, "POST", "/upload", upload_body("C1", "GAS", "2024-05-10")).await?;
    let path = local_path(body["image_url"].as_str().unwrap()).to_string();
    let (file_path, token) = path.split_once("?token=").unwrap();

    let tampered = {
        let mut t = token.to_string();
        let last = if t.ends_with('0') { '1' } else { '0' };
        t.pop();
        t.push(last);
        t
    };
    let expired_token = common::crypto::LinkSigner::new("integration-secret")
        .issue(chrono::Utc::now() - chrono::Duration::seconds(1));

    for uri in [
        file_path.to_string(),
        format!("{file_path}?token={tampered}"),
        format!("{file_path}?token={expired_token}"),
        format!("{file_path}?token=garbage"),
    ] {
        let (status, body) = get_json(&app, &uri).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["error_code"], "INVALID_TOKEN");
    }

    // a valid token does not reveal files that do not exist
    let missing = format!("/temp_images/nope.jpg?token={token}");
    let (status, _) = send(&app, Request::builder().uri(missing).body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_ops_endpoints() -> anyhow::Result<()> {
    let app = build_app(StaticMeterReader::text("5")).await?;

    let (status, body) = get_json(&app, "/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, bytes) = send(&app, Request::builder().uri("/metrics").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes)?;
    assert!(text.contains("meter_reader_uploads_total"));
    assert!(text.contains("meter_reader_link_rejections_total"));

    let (status, doc) = get_json(&app, "/api-docs/openapi.json").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/upload"].is_object());
    assert!(doc["paths"]["/{customer_code}/list"].is_object());
    Ok(())
}
