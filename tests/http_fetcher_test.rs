//! HTTP download primitive tests using wiremock

use chatmon::datastore::{AttachmentFetcher, HttpFetcher, DOWNLOAD_TIMEOUT};
use chatmon::gateway::Attachment;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn attachment(server: &MockServer, file: &str) -> Attachment {
    Attachment {
        id: 1,
        filename: file.to_string(),
        size: 5,
        url: format!("{}/attachments/{}", server.uri(), file)
            .parse()
            .unwrap(),
        proxy_url: None,
    }
}

#[tokio::test]
async fn test_fetch_writes_body_to_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attachments/cat.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"meow!".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("cat_a1.png");
    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();

    assert!(fetcher.fetch(&attachment(&server, "cat.png"), &destination).await);
    assert_eq!(std::fs::read(&destination).unwrap(), b"meow!");
}

#[tokio::test]
async fn test_fetch_reports_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attachments/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("gone.png");
    let fetcher = HttpFetcher::new(DOWNLOAD_TIMEOUT).unwrap();

    assert!(!fetcher.fetch(&attachment(&server, "gone.png"), &destination).await);
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_fetch_reports_unwritable_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("missing-dir").join("file.bin");
    let fetcher = HttpFetcher::new(DOWNLOAD_TIMEOUT).unwrap();

    assert!(!fetcher.fetch(&attachment(&server, "file.bin"), &destination).await);
}

#[tokio::test]
async fn test_fetch_gives_up_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("slow.bin");
    let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();

    assert!(!fetcher.fetch(&attachment(&server, "slow.bin"), &destination).await);
    assert!(!destination.exists());
}
