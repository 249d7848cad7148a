//! Integration tests for the image information document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use super::test_utils::{build_router, test_media_tree};

async fn get_with_accept(
    router: axum::Router,
    uri: &str,
    accept: Option<&str>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().uri(uri).header("host", "iiif.test:3000");
    if let Some(accept) = accept {
        builder = builder.header("accept", accept);
    }
    let response = router.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, headers, json)
}

#[tokio::test]
async fn test_info_document_core_fields() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, headers, json) = get_with_accept(router, "/sample.jpg/info.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");

    assert_eq!(json["@context"], "http://iiif.io/api/image/2/context.json");
    assert_eq!(json["@id"], "http://iiif.test:3000/sample.jpg");
    assert_eq!(json["protocol"], "http://iiif.io/api/image");
    assert_eq!(json["width"], 400);
    assert_eq!(json["height"], 300);
    assert_eq!(json["profile"][0], "http://iiif.io/api/image/2/level2.json");
}

#[tokio::test]
async fn test_info_sizes_include_derivatives_and_full() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (_, _, json) = get_with_accept(router, "/sample.jpg/info.json", None).await;

    let sizes = json["sizes"].as_array().unwrap();
    let widths: Vec<u64> = sizes.iter().map(|s| s["width"].as_u64().unwrap()).collect();
    assert_eq!(widths, vec![100, 200, 400]);
}

#[tokio::test]
async fn test_info_tiles_for_pyramid_source() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (_, _, json) = get_with_accept(router, "/zoom.jpg/info.json", None).await;

    let tiles = json["tiles"].as_array().unwrap();
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0]["width"], 256);
    assert_eq!(
        tiles[0]["scaleFactors"].as_array().unwrap().len(),
        2 // 512px source with 256px tiles: factors 1 and 2
    );
}

#[tokio::test]
async fn test_info_tiles_absent_without_pyramid() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (_, _, json) = get_with_accept(router, "/sample.jpg/info.json", None).await;
    assert!(json.get("tiles").is_none());
}

#[tokio::test]
async fn test_info_content_negotiation() {
    let tree = test_media_tree();

    // Plain JSON by default, with a Link header naming the JSON-LD context
    let (_, headers, _) = get_with_accept(
        build_router(tree.path()),
        "/sample.jpg/info.json",
        None,
    )
    .await;
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    let link = headers.get("link").unwrap().to_str().unwrap();
    assert!(link.contains("http://iiif.io/api/image/2/context.json"));

    // JSON-LD when asked for
    let (_, headers, _) = get_with_accept(
        build_router(tree.path()),
        "/sample.jpg/info.json",
        Some("application/ld+json"),
    )
    .await;
    assert_eq!(headers.get("content-type").unwrap(), "application/ld+json");
}

#[tokio::test]
async fn test_info_missing_identifier_is_404() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, _) = get_with_accept(router, "/missing.jpg/info.json", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bare_identifier_redirects_to_info() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let response = router
        .oneshot(
            Request::builder()
                .uri("/sample.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/sample.jpg/info.json"
    );
}
