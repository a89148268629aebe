use image::{DynamicImage, GenericImageView, ImageFormat};
use image_filter_service::{
    fetch::HttpImageFetcher,
    image::FilterProcessor,
    models::Config,
    pipeline::{FilterPipeline, PipelineServices},
    server::{FilterServer, ServerHandle, INDEX_MESSAGE},
    storage::{NamingStrategy, TransientStore},
    Error,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Noisy photo-like JPEG, large enough to be a realistic upload.
fn cat_jpeg() -> Vec<u8> {
    let img = image::RgbImage::from_fn(400, 300, |x, y| {
        let noise = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)) % 256;
        image::Rgb([noise as u8, ((x + noise) % 256) as u8, ((y * 3) % 256) as u8])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}

fn dog_png() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(64, 128, |x, y| {
        image::Rgba([255, (x * 4) as u8, (y * 2) as u8, 255])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

async fn image_host() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cat.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(cat_jpeg()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dog.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(dog_png()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(b"<html></html>".to_vec()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    server
}

fn real_pipeline(dir: &Path) -> FilterPipeline {
    FilterPipeline::with_services(PipelineServices {
        fetcher: Box::new(HttpImageFetcher::new()),
        transformer: Box::new(FilterProcessor::new()),
        store: Box::new(TransientStore::new(dir, NamingStrategy::default()).unwrap()),
    })
}

fn assert_grey_square(bytes: &[u8]) {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).unwrap();
    assert_eq!(decoded.dimensions(), (256, 256));

    let rgb = decoded.to_rgb8();
    for (x, y) in [(0, 0), (17, 200), (128, 128), (255, 3), (255, 255)] {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1, "pixel ({}, {})", x, y);
    }
}

fn transient_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_cat_jpeg_end_to_end() {
    let host = image_host().await;
    let dir = TempDir::new().unwrap();
    let pipeline = real_pipeline(dir.path());

    let artifact = pipeline
        .filter_image_from_url(&format!("{}/cat.jpg", host.uri()))
        .await
        .unwrap();

    assert!(artifact.path().is_absolute());
    assert_eq!(artifact.path().extension().unwrap(), "jpg");
    assert_grey_square(&std::fs::read(artifact.path()).unwrap());

    pipeline.cleanup(&[artifact.path().to_path_buf()]);
    assert!(!artifact.path().exists());
    pipeline.cleanup(&[artifact.into_path()]);
    assert_eq!(transient_files(dir.path()), 0);
}

#[tokio::test]
async fn test_png_end_to_end() {
    let host = image_host().await;
    let dir = TempDir::new().unwrap();
    let pipeline = real_pipeline(dir.path());

    let artifact = pipeline
        .filter_image_from_url(&format!("{}/dog.png", host.uri()))
        .await
        .unwrap();

    assert_grey_square(&std::fs::read(artifact.path()).unwrap());
    pipeline.cleanup(&[artifact.into_path()]);
}

#[tokio::test]
async fn test_not_a_url_end_to_end() {
    let host = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&host)
        .await;
    let dir = TempDir::new().unwrap();

    let err = real_pipeline(dir.path())
        .filter_image_from_url("not-a-url")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(transient_files(dir.path()), 0);
}

#[tokio::test]
async fn test_missing_image_end_to_end() {
    let host = image_host().await;
    let dir = TempDir::new().unwrap();

    let err = real_pipeline(dir.path())
        .filter_image_from_url(&format!("{}/missing.jpg", host.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upstream { status: 404, .. }));
    assert_eq!(transient_files(dir.path()), 0);
}

#[tokio::test]
async fn test_html_page_end_to_end() {
    let host = image_host().await;
    let dir = TempDir::new().unwrap();

    let err = real_pipeline(dir.path())
        .filter_image_from_url(&format!("{}/page.html", host.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedContentType(_)));
}

#[test]
fn test_from_config_uses_env_style_settings() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_lookup(|key| match key {
        "FILTER_TRANSIENT_DIR" => Some(dir.path().join("out").to_string_lossy().into_owned()),
        "FILTER_NAMING" => Some("uuid".to_string()),
        _ => None,
    })
    .unwrap();

    FilterPipeline::from_config(&config).unwrap();
    assert!(dir.path().join("out").is_dir());
}

struct RunningServer {
    handle: Option<ServerHandle>,
    base_url: String,
}

impl RunningServer {
    fn start(dir: &Path) -> Self {
        let server =
            FilterServer::bind("127.0.0.1:0", Arc::new(real_pipeline(dir))).unwrap();
        let handle = server.spawn().unwrap();
        let base_url = format!("http://{}", handle.local_addr().unwrap());
        Self {
            handle: Some(handle),
            base_url,
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
        }
    }
}

async fn wait_until_empty(dir: &Path) -> bool {
    for _ in 0..50 {
        if transient_files(dir) == 0 {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_filteredimage_streams_jpeg_then_deletes_it() {
    let host = image_host().await;
    let dir = TempDir::new().unwrap();
    let server = RunningServer::start(dir.path());

    let response = reqwest::Client::new()
        .get(format!("{}/filteredimage", server.base_url))
        .query(&[("image_url", format!("{}/cat.jpg", host.uri()))])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    let body = response.bytes().await.unwrap();
    assert_grey_square(&body);

    assert!(wait_until_empty(dir.path()).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_missing_image_url_is_400() {
    let dir = TempDir::new().unwrap();
    let server = RunningServer::start(dir.path());

    let response = reqwest::get(format!("{}/filteredimage", server.base_url))
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "image_url is required");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_pipeline_failures_collapse_to_422() {
    let host = image_host().await;
    let dir = TempDir::new().unwrap();
    let server = RunningServer::start(dir.path());
    let client = reqwest::Client::new();

    for image_url in [
        "not-a-url".to_string(),
        "ftp://x/y.png".to_string(),
        format!("{}/missing.jpg", host.uri()),
        format!("{}/page.html", host.uri()),
    ] {
        let response = client
            .get(format!("{}/filteredimage", server.base_url))
            .query(&[("image_url", &image_url)])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 422, "{}", image_url);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(
            body["message"],
            "Unable to process the image at the provided URL."
        );
    }

    assert_eq!(transient_files(dir.path()), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_index_and_unknown_paths() {
    let dir = TempDir::new().unwrap();
    let server = RunningServer::start(dir.path());

    let index = reqwest::get(format!("{}/", server.base_url)).await.unwrap();
    assert_eq!(index.status(), 200);
    assert_eq!(index.text().await.unwrap(), INDEX_MESSAGE);

    let missing = reqwest::get(format!("{}/elsewhere", server.base_url))
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}
