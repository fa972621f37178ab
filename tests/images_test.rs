//! `ImageCache` against a local mock server.

use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront_kit::images::ImageCache;

async fn serve(server: &MockServer, route: &str, status: u16, content_type: Option<&str>) {
    let mut response = ResponseTemplate::new(status).set_body_bytes(b"img".to_vec());
    if let Some(ct) = content_type {
        response = response.insert_header("content-type", ct);
    }
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn numbering_skips_failed_downloads_but_result_stays_aligned() {
    let server = MockServer::start().await;
    serve(&server, "/a.png", 200, Some("image/png")).await;
    serve(&server, "/missing", 404, None).await;
    serve(&server, "/b", 200, Some("image/jpeg")).await;
    serve(&server, "/c.webp", 200, None).await;

    let td = tempdir().unwrap();
    let cache = ImageCache::new(td.path()).unwrap().with_spacing(Duration::ZERO);
    let urls: Vec<String> = ["a.png", "missing", "b", "c.webp"]
        .iter()
        .map(|p| format!("{}/{}", server.uri(), p))
        .collect();

    let cached = cache.cache_for_sku("CYS TENT/1", &urls).await;

    let prefix = td.path().to_string_lossy().replace('\\', "/");
    assert_eq!(
        cached,
        vec![
            Some(format!("{prefix}/CYS-TENT-1/01.png")),
            None,
            Some(format!("{prefix}/CYS-TENT-1/02.jpg")),
            Some(format!("{prefix}/CYS-TENT-1/03.webp")),
        ]
    );
    for name in ["01.png", "02.jpg", "03.webp"] {
        assert!(td.path().join("CYS-TENT-1").join(name).exists(), "{name}");
    }
}

#[tokio::test]
async fn unreachable_host_yields_none() {
    let td = tempdir().unwrap();
    let cache = ImageCache::new(td.path()).unwrap().with_spacing(Duration::ZERO);

    let cached = cache
        .cache_for_sku("X-1", &["http://127.0.0.1:1/a.png".to_string()])
        .await;

    assert_eq!(cached, vec![None]);
}
