//! API integration tests for the IIIF endpoints.
//!
//! Tests verify:
//! - Redirects and info.json for both API versions
//! - Passthrough tiles are the stored bytes with tables spliced in
//! - Edge tiles and padded single-tile levels are cropped
//! - HTTP status codes, headers and error bodies

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use iiif_streamer::iiif::ApiVersion;
use iiif_streamer::server::RouterConfig;
use iiif_streamer::tile::IMMUTABLE_CACHE_CONTROL;

use super::test_utils::{
    body_bytes, body_json, catalog_dir, get, is_valid_jpeg, jpeg_dimensions, router_for,
    jpeg_level, sample_pyramid, square_pyramid, test_config, Fixture, TiffBuilder,
};

async fn sample_router() -> (tempfile::TempDir, axum::Router, Fixture) {
    let fixture = sample_pyramid(TiffBuilder::new(), true);
    let dir = catalog_dir(&[("sample.tif", &fixture.data)]);
    let router = router_for(&dir, test_config()).await;
    (dir, router, fixture)
}

// =============================================================================
// Capability Documents
// =============================================================================

#[tokio::test]
async fn test_info_json_v3() {
    let (_dir, router, _) = sample_router().await;

    let response = get(&router, "/iiif/3/sample/info.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/ld+json;profile=\"http://iiif.io/api/image/3/context.json\""
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );

    let doc = body_json(response).await;
    assert_eq!(
        doc,
        json!({
            "@context": "http://iiif.io/api/image/3/context.json",
            "id": "http://example.org/iiif/3/sample",
            "type": "ImageService3",
            "protocol": "http://iiif.io/api/image",
            "profile": "level0",
            "width": 1000,
            "height": 700,
            "tiles": [{"width": 256, "height": 256, "scaleFactors": [1, 2, 4]}]
        })
    );
}

#[tokio::test]
async fn test_info_json_v2() {
    let (_dir, router, _) = sample_router().await;

    let response = get(&router, "/iiif/2/sample/info.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/ld+json;profile=\"http://iiif.io/api/image/2/context.json\""
    );

    let doc = body_json(response).await;
    assert_eq!(doc["@context"], "http://iiif.io/api/image/2/context.json");
    assert_eq!(doc["@id"], "http://example.org/iiif/2/sample");
    assert_eq!(doc["protocol"], "http://iiif.io/api/image");
    assert_eq!(
        doc["profile"],
        json!([
            "http://iiif.io/api/image/2/level0.json",
            {"formats": ["jpg"], "qualities": ["default"]}
        ])
    );
    assert_eq!(doc["tiles"][0]["scaleFactors"], json!([1, 2, 4]));
    assert!(doc.get("id").is_none());
    assert!(doc.get("type").is_none());
}

#[tokio::test]
async fn test_unprefixed_path_uses_default_version() {
    let fixture = sample_pyramid(TiffBuilder::new(), false);
    let dir = catalog_dir(&[("sample.tif", &fixture.data)]);

    let v3 = router_for(&dir, test_config()).await;
    let doc = body_json(get(&v3, "/iiif/sample/info.json").await).await;
    assert_eq!(doc["id"], "http://example.org/iiif/3/sample");

    let v2 = router_for(&dir, test_config().with_default_version(ApiVersion::V2)).await;
    let doc = body_json(get(&v2, "/iiif/sample/info.json").await).await;
    assert_eq!(doc["@id"], "http://example.org/iiif/2/sample");
}

#[tokio::test]
async fn test_base_url_from_forwarded_headers() {
    let fixture = sample_pyramid(TiffBuilder::new(), false);
    let dir = catalog_dir(&[("sample.tif", &fixture.data)]);
    let router = router_for(&dir, RouterConfig::new()).await;

    let request = Request::builder()
        .uri("/iiif/3/sample/info.json")
        .header(header::HOST, "tiles.example.net")
        .header("x-forwarded-proto", "https")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    let doc = body_json(response).await;
    assert_eq!(doc["id"], "https://tiles.example.net/iiif/3/sample");
}

#[tokio::test]
async fn test_encoded_identifier() {
    let fixture = sample_pyramid(TiffBuilder::new(), false);
    let dir = catalog_dir(&[("my image.tiff", &fixture.data)]);
    let router = router_for(&dir, test_config()).await;

    let response = get(&router, "/iiif/3/my%20image/info.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let doc = body_json(response).await;
    assert_eq!(doc["id"], "http://example.org/iiif/3/my%20image");
}

// =============================================================================
// Redirects
// =============================================================================

#[tokio::test]
async fn test_base_redirects_to_info() {
    let (_dir, router, _) = sample_router().await;

    let response = get(&router, "/iiif/sample").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "http://example.org/iiif/3/sample/info.json"
    );

    let response = get(&router, "/iiif/2/sample").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "http://example.org/iiif/2/sample/info.json"
    );
}

#[tokio::test]
async fn test_redirect_for_unknown_identifier_is_404() {
    let (_dir, router, _) = sample_router().await;
    let response = get(&router, "/iiif/3/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_interior_tile_is_passthrough() {
    let (_dir, router, fixture) = sample_router().await;

    let response = get(&router, "/iiif/3/sample/256,256,256,256/256,256/0/default.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        IMMUTABLE_CACHE_CONTROL
    );

    let expected = &fixture.expected[0][5];
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        &expected.len().to_string()
    );

    let body = body_bytes(response).await;
    assert_eq!(&body, expected);
    assert_eq!(jpeg_dimensions(&body), (256, 256));
}

#[tokio::test]
async fn test_partial_size_forms_select_same_tile() {
    let (_dir, router, fixture) = sample_router().await;

    for size in ["256,", ",256", "256,256", "max", "full"] {
        let uri = format!("/iiif/3/sample/0,256,256,256/{}/0/default.jpg", size);
        let response = get(&router, &uri).await;
        assert_eq!(response.status(), StatusCode::OK, "size {}", size);
        assert_eq!(body_bytes(response).await, fixture.expected[0][4]);
    }
}

#[tokio::test]
async fn test_lower_level_tile() {
    let (_dir, router, fixture) = sample_router().await;

    let response = get(&router, "/iiif/3/sample/0,0,512,512/256,256/0/default.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, fixture.expected[1][0]);
}

#[tokio::test]
async fn test_edge_tile_is_cropped() {
    let (_dir, router, _) = sample_router().await;

    let response = get(&router, "/iiif/3/sample/768,512,232,188/232,188/0/default.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        IMMUTABLE_CACHE_CONTROL
    );

    let length: usize = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = body_bytes(response).await;
    assert_eq!(body.len(), length);
    assert!(is_valid_jpeg(&body));
    assert_eq!(jpeg_dimensions(&body), (232, 188));
}

#[tokio::test]
async fn test_lower_level_edge_tile_is_cropped() {
    let (_dir, router, _) = sample_router().await;

    let response = get(&router, "/iiif/3/sample/512,0,488,512/244,/0/default.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(jpeg_dimensions(&body_bytes(response).await), (244, 256));
}

#[tokio::test]
async fn test_full_region_from_padded_single_tile() {
    let (_dir, router, _) = sample_router().await;

    for size in ["250,", ",175", "250,175"] {
        let uri = format!("/iiif/3/sample/full/{}/0/default.jpg", size);
        let response = get(&router, &uri).await;
        assert_eq!(response.status(), StatusCode::OK, "size {}", size);
        assert_eq!(jpeg_dimensions(&body_bytes(response).await), (250, 175));
    }
}

#[tokio::test]
async fn test_full_region_from_exact_single_tile() {
    let fixture = square_pyramid();
    let dir = catalog_dir(&[("square.tif", &fixture.data)]);
    let router = router_for(&dir, test_config()).await;

    let response = get(&router, "/iiif/2/square/full/256,/0/default.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, fixture.expected[1][0]);
    // Only levels filling their tile are advertised
    let doc = body_json(get(&router, "/iiif/2/square/info.json").await).await;
    assert_eq!(doc["sizes"], json!([{"width": 256, "height": 256}]));
}

#[tokio::test]
async fn test_whole_image_region_served_from_single_tile_level() {
    let (base, _) = jpeg_level(1024, 1024, 256, 1, true);
    let (thumb, thumb_tiles) = jpeg_level(128, 128, 128, 2, true);
    let data = TiffBuilder::new().level(base).level(thumb).build();
    let dir = catalog_dir(&[("thumb.tif", data.as_slice())]);
    let router = router_for(&dir, test_config()).await;

    for region in ["full", "0,0,1024,1024"] {
        let uri = format!("/iiif/3/thumb/{}/128,128/0/default.jpg", region);
        let response = get(&router, &uri).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(body_bytes(response).await, thumb_tiles[0], "{}", uri);
    }

    let response = get(&router, "/iiif/3/thumb/0,0,1024,1024/1024,1024/0/default.jpg").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_repeated_requests_are_byte_identical() {
    let (_dir, router, _) = sample_router().await;

    for uri in [
        "/iiif/3/sample/256,256,256,256/256,256/0/default.jpg",
        "/iiif/3/sample/768,512,232,188/232,188/0/default.jpg",
    ] {
        let first = get(&router, uri).await;
        let second = get(&router, uri).await;
        assert_eq!(first.status(), StatusCode::OK, "{}", uri);
        assert_eq!(second.status(), StatusCode::OK, "{}", uri);
        assert_eq!(
            first.headers().get(header::CONTENT_LENGTH),
            second.headers().get(header::CONTENT_LENGTH),
            "{}",
            uri
        );
        assert_eq!(body_bytes(first).await, body_bytes(second).await, "{}", uri);
    }
}

#[tokio::test]
async fn test_head_request() {
    let (_dir, router, fixture) = sample_router().await;

    let request = Request::builder()
        .method("HEAD")
        .uri("/iiif/3/sample/0,0,256,256/256,256/0/default.jpg")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_LENGTH).unwrap(),
        &fixture.expected[0][0].len().to_string()
    );
}

// =============================================================================
// Errors
// =============================================================================

async fn assert_error(router: &axum::Router, uri: &str, status: StatusCode, kind: &str) {
    let response = get(router, uri).await;
    assert_eq!(response.status(), status, "{}", uri);

    let error = body_json(response).await;
    assert_eq!(error["error"], kind, "{}", uri);
    assert_eq!(error["status"], status.as_u16(), "{}", uri);
    assert!(error["message"].is_string());
}

#[tokio::test]
async fn test_unknown_identifier() {
    let (_dir, router, _) = sample_router().await;

    assert_error(
        &router,
        "/iiif/3/missing/info.json",
        StatusCode::NOT_FOUND,
        "not_found",
    )
    .await;
    // Lookup happens before the parameters are checked
    assert_error(
        &router,
        "/iiif/3/missing/bogus/max/0/default.jpg",
        StatusCode::NOT_FOUND,
        "not_found",
    )
    .await;
}

#[tokio::test]
async fn test_grammar_errors() {
    let (_dir, router, _) = sample_router().await;
    let cases = [
        ("/iiif/3/sample/a/b", "invalid_path"),
        ("/iiif/3/sample/", "invalid_path"),
        ("/iiif/4/sample/info.json", "unsupported_version"),
        ("/iiif/3/sample/pct:10,10,10,10/max/0/default.jpg", "invalid_region"),
        ("/iiif/3/sample/0,0,0,256/max/0/default.jpg", "invalid_region"),
        ("/iiif/3/sample/full/pct:50/0/default.jpg", "invalid_size"),
        ("/iiif/3/sample/full/!256,256/0/default.jpg", "invalid_size"),
        ("/iiif/3/sample/full/max/90/default.jpg", "invalid_rotation"),
        ("/iiif/3/sample/full/max/!0/default.jpg", "invalid_rotation"),
        ("/iiif/3/sample/full/max/0/gray.jpg", "unsupported_format"),
        ("/iiif/3/sample/full/max/0/default.png", "unsupported_format"),
    ];

    for (uri, kind) in cases {
        assert_error(&router, uri, StatusCode::BAD_REQUEST, kind).await;
    }
}

#[tokio::test]
async fn test_unservable_requests() {
    let (_dir, router, _) = sample_router().await;

    assert_error(
        &router,
        "/iiif/3/sample/full/1000,700/0/default.jpg",
        StatusCode::BAD_REQUEST,
        "no_passthrough_size",
    )
    .await;
    // `max` is the whole image at full resolution
    assert_error(
        &router,
        "/iiif/3/sample/full/max/0/default.jpg",
        StatusCode::BAD_REQUEST,
        "no_passthrough_size",
    )
    .await;
    assert_error(
        &router,
        "/iiif/3/sample/100,0,256,256/256,256/0/default.jpg",
        StatusCode::BAD_REQUEST,
        "not_tile_aligned",
    )
    .await;
    // Right footprint, wrong output size
    assert_error(
        &router,
        "/iiif/3/sample/0,0,256,256/128,128/0/default.jpg",
        StatusCode::BAD_REQUEST,
        "not_tile_aligned",
    )
    .await;
    // Edge footprint asked for at full tile size
    assert_error(
        &router,
        "/iiif/3/sample/768,512,232,188/256,256/0/default.jpg",
        StatusCode::BAD_REQUEST,
        "not_tile_aligned",
    )
    .await;
}

// =============================================================================
// Listing, Health, CORS
// =============================================================================

#[tokio::test]
async fn test_list_images() {
    let sample = sample_pyramid(TiffBuilder::new(), false);
    let square = square_pyramid();
    let dir = catalog_dir(&[
        ("square.tif", square.data.as_slice()),
        ("sample.ptif", sample.data.as_slice()),
        ("notes.txt", b"not an image".as_slice()),
    ]);
    let router = router_for(&dir, test_config()).await;

    let response = get(&router, "/iiif").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"images": ["sample", "square"]})
    );
}

#[tokio::test]
async fn test_health_check() {
    let (_dir, router, _) = sample_router().await;

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_cors_any_origin() {
    let (_dir, router, _) = sample_router().await;

    let request = Request::builder()
        .uri("/iiif/3/sample/info.json")
        .header(header::ORIGIN, "https://viewer.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_unknown_route() {
    let (_dir, router, _) = sample_router().await;
    let response = get(&router, "/tiles/sample/0/0/0.jpg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
