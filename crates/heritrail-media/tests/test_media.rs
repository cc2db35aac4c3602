//! Image proxy end to end against a mocked image host.

use std::io::Cursor;

use heritrail_config::MediaConfig;
use heritrail_media::{MediaError, MediaService, ProxyParams};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([90, 60, 30, 255]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img).write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn service(allow_private_hosts: bool) -> MediaService {
    MediaService::new(&MediaConfig::default(), "heritrail-test", allow_private_hosts).unwrap()
}

async fn host_with(body: Vec<u8>, content_type: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .mount(&server)
        .await;
    server
}

fn params(server: &MockServer, w: Option<i64>) -> ProxyParams {
    ProxyParams { url: format!("{}/img", server.uri()), w, q: None }
}

#[tokio::test]
async fn test_proxy_resizes_remote_png() {
    let server = host_with(png(600, 300), "image/png").await;
    let out = service(true).proxy(&params(&server, Some(300))).await.unwrap();
    assert_eq!((out.width, out.height), (300, 150));
    assert_eq!(&out.bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_proxy_rejects_non_images() {
    let server = host_with(b"<html></html>".to_vec(), "text/html").await;
    let err = service(true).proxy(&params(&server, None)).await.unwrap_err();
    assert!(matches!(err, MediaError::NotAnImage(_)));
}

#[tokio::test]
async fn test_proxy_enforces_size_cap() {
    let server = host_with(png(64, 64), "image/png").await;
    let config = MediaConfig { max_bytes: 16, ..Default::default() };
    let media = MediaService::new(&config, "heritrail-test", true).unwrap();
    let err = media.proxy(&params(&server, None)).await.unwrap_err();
    assert!(matches!(err, MediaError::TooLarge { max: 16, .. }));
}

#[tokio::test]
async fn test_proxy_blocks_private_hosts_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let err = service(false).proxy(&params(&server, None)).await.unwrap_err();
    assert!(matches!(err, MediaError::Blocked(_)));

    let err = service(false)
        .proxy(&ProxyParams { url: "file:///etc/passwd".into(), w: None, q: None })
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::Blocked(_)));
}

#[tokio::test]
async fn test_upstream_errors_are_fetch_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let err = service(true).proxy(&params(&server, None)).await.unwrap_err();
    assert!(matches!(err, MediaError::Fetch(_)));
}

#[tokio::test]
async fn test_variants_for_upload() {
    let variants = service(false).variants(png(2400, 1200)).await.unwrap();
    let widths: Vec<u32> = variants.iter().map(|v| v.width).collect();
    assert_eq!(widths, vec![320, 960, 1920]);
}
