use archivist_engine::{
    AudioPageResolver, FetchSettings, PageFetcher, StreamResolver, TrackError,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver() -> AudioPageResolver {
    AudioPageResolver::new(PageFetcher::new(&FetchSettings::default()).expect("client builds"))
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn resolves_absolute_audio_source() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/track/1",
        "<html><audio src=\"https://cdn.example.test/one.mp3\"></audio></html>".to_string(),
    )
    .await;

    let link = resolver()
        .resolve(&format!("{}/track/1", server.uri()))
        .await
        .expect("resolves");
    assert_eq!(link.stream_url, "https://cdn.example.test/one.mp3");
}

#[tokio::test]
async fn relative_audio_source_joins_the_page_url() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/track/2",
        "<html><audio src=\"/streams/two.mp3\"></audio></html>".to_string(),
    )
    .await;

    let link = resolver()
        .resolve(&format!("{}/track/2", server.uri()))
        .await
        .expect("resolves");
    assert_eq!(link.stream_url, format!("{}/streams/two.mp3", server.uri()));
}

#[tokio::test]
async fn page_without_audio_is_a_parse_failure() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/track/3",
        "<html><p>player removed</p></html>".to_string(),
    )
    .await;

    let url = format!("{}/track/3", server.uri());
    let err = resolver().resolve(&url).await.unwrap_err();
    match err {
        TrackError::MissingAudioSource { url: reported } => assert_eq!(reported, url),
        other => panic!("expected MissingAudioSource, got {other:?}"),
    }
}

#[tokio::test]
async fn http_failure_propagates_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/track/4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = resolver()
        .resolve(&format!("{}/track/4", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackError::HttpStatus { status: 500, .. }));
}
