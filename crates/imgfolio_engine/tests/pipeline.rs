use std::io::Cursor;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use imgfolio_engine::{
    EngineConfig, EngineEvent, EngineHandle, FailureKind, FetchSettings, ImageSource,
    NullProgressSink, PdfError, Pipeline, RasterError, ReqwestFetcher,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 0, 180]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

async fn gallery_server() -> MockServer {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <h1>Holiday</h1>
        <img src="img/one.png">
        <img src="/img/two.png">
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/album/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html; charset=utf-8"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/album/img/one.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png(8, 4), "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/two.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png(4, 8), "image/png"))
        .mount(&server)
        .await;
    server
}

fn direct_config(dir: &TempDir) -> EngineConfig {
    let mut config = EngineConfig::default_with_output(dir.path().to_path_buf());
    config.fetch = FetchSettings::direct();
    config
}

#[tokio::test]
async fn fetch_then_build_end_to_end() {
    let server = gallery_server().await;
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(direct_config(&temp)).unwrap();
    let page_url = format!("{}/album/index.html", server.uri());

    let page = pipeline
        .fetch_images(1, &page_url, &NullProgressSink)
        .await
        .expect("page fetched");
    assert_eq!(
        page.images,
        vec![
            format!("{}/album/img/one.png", server.uri()),
            format!("{}/img/two.png", server.uri()),
        ]
    );
    assert_eq!(page.encoding_label, "UTF-8");

    let saved = pipeline
        .save_pdf(2, &page.images, &NullProgressSink)
        .await
        .expect("pdf saved");
    assert_eq!(saved.page_count, 2);
    assert!(saved.path.ends_with("images.pdf"));
    assert!(saved.path.exists());
}

#[tokio::test]
async fn missing_image_fails_whole_download() {
    let server = gallery_server().await;
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(direct_config(&temp)).unwrap();
    let images = vec![
        format!("{}/album/img/one.png", server.uri()),
        format!("{}/img/gone.png", server.uri()),
    ];

    assert!(pipeline.save_pdf(1, &images, &NullProgressSink).await.is_err());
    assert!(!temp.path().join("images.pdf").exists());
}

fn wait_for<F>(engine: &EngineHandle, mut pick: F) -> EngineEvent
where
    F: FnMut(&EngineEvent) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(event) = engine.recv_timeout(Duration::from_millis(50)) {
            if pick(&event) {
                return event;
            }
        }
    }
    panic!("engine produced no matching event in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_handle_reports_results_as_events() {
    let server = gallery_server().await;
    let temp = TempDir::new().unwrap();
    let engine = EngineHandle::new(direct_config(&temp)).unwrap();

    engine.fetch_page(5, format!("{}/album/index.html", server.uri()));
    let event = tokio::task::block_in_place(|| {
        wait_for(&engine, |e| matches!(e, EngineEvent::PageFetched { .. }))
    });
    let images = match event {
        EngineEvent::PageFetched { request_id: 5, result: Ok(page) } => page.images,
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(images.len(), 2);

    engine.build_pdf(6, images);
    let event = tokio::task::block_in_place(|| {
        wait_for(&engine, |e| matches!(e, EngineEvent::PdfSaved { .. }))
    });
    match event {
        EngineEvent::PdfSaved { request_id: 6, result: Ok(saved) } => {
            assert_eq!(saved.page_count, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn direct_fetch_resolves_against_the_redirected_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/album/", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/album/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<img src="img/one.png">"#,
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(direct_config(&temp)).unwrap();
    let page = pipeline
        .fetch_images(1, &format!("{}/album", server.uri()), &NullProgressSink)
        .await
        .expect("page fetched");

    assert_eq!(page.page_url, format!("{}/album/", server.uri()));
    assert_eq!(page.images, vec![format!("{}/album/img/one.png", server.uri())]);
}

#[tokio::test]
async fn proxied_fetch_resolves_against_the_requested_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<img src="img/one.png"><img src="/two.png">"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = direct_config(&temp);
    config.fetch.proxy_prefix = Some(format!("{}/proxy?", server.uri()));
    let pipeline = Pipeline::new(config).unwrap();
    let page = pipeline
        .fetch_images(1, "https://site.test/album/", &NullProgressSink)
        .await
        .expect("page fetched");

    assert_eq!(page.page_url, "https://site.test/album/");
    assert_eq!(
        page.images,
        vec![
            "https://site.test/album/img/one.png".to_string(),
            "https://site.test/two.png".to_string(),
        ]
    );
}

struct PanickingSource;

#[async_trait::async_trait]
impl ImageSource for PanickingSource {
    async fn load(&self, url: &str) -> Result<Vec<u8>, RasterError> {
        panic!("source blew up on {url}");
    }
}

#[test]
fn panicking_job_still_reports_a_failed_result() {
    let temp = TempDir::new().unwrap();
    let config = direct_config(&temp);
    let pipeline = Pipeline::with_parts(
        config.clone(),
        Box::new(ReqwestFetcher::new(config.fetch.clone())),
        Box::new(PanickingSource),
    );
    let engine = EngineHandle::with_pipeline(pipeline).unwrap();

    engine.build_pdf(7, vec!["https://x.test/a.png".to_string()]);
    match wait_for(&engine, |e| matches!(e, EngineEvent::PdfSaved { .. })) {
        EngineEvent::PdfSaved { request_id: 7, result: Err(PdfError::Internal(_)) } => {}
        other => panic!("unexpected event {other:?}"),
    }

    // The worker survives and keeps answering.
    engine.fetch_page(8, "not a url");
    match wait_for(&engine, |e| matches!(e, EngineEvent::PageFetched { .. })) {
        EngineEvent::PageFetched { request_id: 8, result: Err(err) } => {
            assert_eq!(err.kind, FailureKind::InvalidUrl);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(!temp.path().join("images.pdf").exists());
}
