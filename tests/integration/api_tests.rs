//! API integration tests for image requests and error handling.
//!
//! Tests verify:
//! - All delivery plans end to end (passthrough, derivative, tile, dynamic)
//! - Response headers (content type, profile link, delivery plan)
//! - Error cases (malformed tokens, missing media, unsupported output)

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{build_router, is_valid_jpeg, test_media_tree};

async fn get(router: axum::Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .header("origin", "https://viewer.example.org")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

// =============================================================================
// Delivery plans
// =============================================================================

#[tokio::test]
async fn test_identity_request_streams_original() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, headers, body) =
        get(router, "/sample.jpg/full/full/0/default.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/jpeg");
    assert_eq!(headers.get("x-delivery-plan").unwrap(), "passthrough");

    // Byte-for-byte the original file: no backend was invoked
    let original = std::fs::read(tree.path().join("sample.jpg")).unwrap();
    assert_eq!(body, original);
}

#[tokio::test]
async fn test_pct_full_region_equals_full() {
    let tree = test_media_tree();

    let (_, headers_full, body_full) = get(
        build_router(tree.path()),
        "/sample.jpg/full/full/0/default.jpg",
    )
    .await;
    let (_, headers_pct, body_pct) = get(
        build_router(tree.path()),
        "/sample.jpg/pct:0,0,100,100/full/0/default.jpg",
    )
    .await;

    assert_eq!(
        headers_full.get("x-delivery-plan").unwrap(),
        headers_pct.get("x-delivery-plan").unwrap()
    );
    assert_eq!(body_full, body_pct);
}

#[tokio::test]
async fn test_exact_derivative_dimensions_reuse_derivative() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    // 200,150 exactly matches the fullsize derivative
    let (status, headers, body) =
        get(router, "/sample.jpg/full/200,150/0/default.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-delivery-plan").unwrap(), "derivative");
    let derivative = std::fs::read(tree.path().join("fullsize/sample.jpg")).unwrap();
    assert_eq!(body, derivative);
}

#[tokio::test]
async fn test_small_size_transforms_from_derivative() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, headers, body) = get(router, "/sample.jpg/full/50,/0/default.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("x-delivery-plan").unwrap(),
        "derivative-transform"
    );
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (50, 38));
}

#[tokio::test]
async fn test_zoomify_tile_reuse() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    // The finest tier's second column maps straight onto a tile file
    let (status, headers, body) =
        get(router, "/zoom.jpg/256,0,256,256/256,/0/default.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-delivery-plan").unwrap(), "tile");
    let tile = std::fs::read(tree.path().join("zoom_zdata/TileGroup0/1-1-0.jpg")).unwrap();
    assert_eq!(body, tile);
}

#[tokio::test]
async fn test_deepzoom_tile_with_overlap_crop() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    // Tile (9, 1, 0) exists on disk as 257x257 with a 1px left border;
    // the engine must shave it off and return exactly 256x256
    let (status, headers, body) =
        get(router, "/deep.jpg/256,0,256,256/256,/0/default.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-delivery-plan").unwrap(), "tile-transform");
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (256, 256));
}

#[tokio::test]
async fn test_unaligned_region_is_dynamic() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, headers, body) =
        get(router, "/sample.jpg/10,10,200,100/100,/0/default.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-delivery-plan").unwrap(), "dynamic");
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (100, 50));
}

// =============================================================================
// Transform semantics
// =============================================================================

#[tokio::test]
async fn test_width_only_size_preserves_region_aspect() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    // 400x300 original at width 300: height follows the region aspect.
    // 300 is wider than any derivative, so this comes from the original.
    let (status, headers, body) = get(router, "/sample.jpg/full/300,/0/default.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-delivery-plan").unwrap(), "dynamic");
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (300, 225));
}

#[tokio::test]
async fn test_mirror_and_rotation() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, body) = get(router, "/sample.jpg/full/100,/!90/default.png").await;

    assert_eq!(status, StatusCode::OK);
    // 100x75 rotated by 90 degrees is 75x100
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (75, 100));
}

#[tokio::test]
async fn test_gray_quality() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, body) = get(router, "/sample.jpg/full/100,/0/gray.png").await;

    assert_eq!(status, StatusCode::OK);
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!(img.color().channel_count(), 1);
}

#[tokio::test]
async fn test_webp_output() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, headers, body) = get(router, "/sample.jpg/full/100,/0/default.webp").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/webp");
    assert_eq!(&body[..4], b"RIFF");
}

#[tokio::test]
async fn test_png_output_from_jpeg_source() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, headers, body) = get(router, "/sample.jpg/full/full/0/default.png").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/png");
    assert_eq!(&body[1..4], b"PNG");
}

// =============================================================================
// Headers
// =============================================================================

#[tokio::test]
async fn test_profile_link_and_cache_headers() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (_, headers, _) = get(router, "/sample.jpg/full/full/0/default.jpg").await;

    let link = headers.get("link").unwrap().to_str().unwrap();
    assert!(link.contains("http://iiif.io/api/image/2/level2.json"));
    assert!(link.contains("rel=\"profile\""));
    assert!(headers.contains_key("cache-control"));
}

#[tokio::test]
async fn test_cors_header_always_open() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (_, headers, _) = get(router, "/sample.jpg/full/full/0/default.jpg").await;
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_missing_identifier_is_404() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, body) = get(router, "/missing.jpg/full/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8_lossy(&body).contains("not_found"));
}

#[tokio::test]
async fn test_malformed_region_is_400() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, body) = get(router, "/sample.jpg/1,2,3/full/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("invalid_request"));
}

#[tokio::test]
async fn test_malformed_size_is_400() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, _) = get(router, "/sample.jpg/full/pct:0/0/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_negative_rotation_is_400() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, _) = get(router, "/sample.jpg/full/full/-90/default.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_quality_is_400() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, _) = get(router, "/sample.jpg/full/full/0/sepia.jpg").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_format_is_400() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, _) = get(router, "/sample.jpg/full/full/0/default.bmp").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_output_is_501() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    // The test router registers the raster backend only; PDF output is a
    // valid request nothing can satisfy
    let (status, _, body) = get(router, "/sample.jpg/full/full/0/default.pdf").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert!(String::from_utf8_lossy(&body).contains("unsupported_conversion"));
}

#[tokio::test]
async fn test_arbitrary_rotation_without_capable_backend_is_501() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, _) = get(router, "/sample.jpg/full/full/22.5/default.jpg").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_health_endpoint() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    let (status, _, body) = get(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("healthy"));
}

#[tokio::test]
async fn test_quarter_rotation_everywhere_valid() {
    let tree = test_media_tree();
    let router = build_router(tree.path());

    // "090" normalizes to a lossless 90-degree turn
    let (status, _, body) = get(router, "/sample.jpg/full/full/090/default.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert!(is_valid_jpeg(&body));
    let img = image::load_from_memory(&body).unwrap();
    assert_eq!((img.width(), img.height()), (300, 400));
}
