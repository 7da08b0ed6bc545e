// HTTP adapters exercised against a local mock server.
use food_scout::{
    ChatMessage, Classifier, FetchConfig, Fetcher, OpenAiClassifier, PageFetcher, ScoutError,
};
use mockito::{Matcher, Server};
use serde_json::json;

fn quick_config() -> FetchConfig {
    FetchConfig {
        max_retries: 0,
        retry_delay_seconds: 0,
        timeout_seconds: 5,
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn test_fetch_event_page() {
    let mut server = Server::new_async().await;
    let page = server
        .mock("GET", "/hack-night")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body><p>Pizza at 7</p></body></html>")
        .create_async()
        .await;

    let fetcher = Fetcher::new(quick_config()).unwrap();
    let body = fetcher
        .fetch(&format!("{}/hack-night", server.url()))
        .await
        .unwrap();

    assert!(body.contains("Pizza at 7"));
    page.assert_async().await;
}

#[tokio::test]
async fn test_missing_event_page_is_event_fetch_error() {
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", "/gone")
        .with_status(404)
        .create_async()
        .await;

    let fetcher = Fetcher::new(quick_config()).unwrap();
    let result = fetcher.fetch(&format!("{}/gone", server.url())).await;

    match result {
        Err(ScoutError::EventFetch { reason, .. }) => assert!(reason.contains("404")),
        other => panic!("expected EventFetch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_event_fetch_error() {
    let fetcher = Fetcher::new(quick_config()).unwrap();
    let result = fetcher.fetch("http://127.0.0.1:9/nothing-listens-here").await;
    assert!(matches!(result, Err(ScoutError::EventFetch { .. })));
}

#[tokio::test]
async fn test_fetch_feed() {
    let mut server = Server::new_async().await;
    let feed = server
        .mock("GET", "/ics/get")
        .match_query(Matcher::UrlEncoded("entity".into(), "discover".into()))
        .with_status(200)
        .with_header("content-type", "text/calendar")
        .with_body("BEGIN:VCALENDAR\nEND:VCALENDAR\n")
        .create_async()
        .await;

    let fetcher = Fetcher::new(quick_config()).unwrap();
    let body = fetcher
        .fetch_feed(&format!("{}/ics/get?entity=discover", server.url()))
        .await
        .unwrap();

    assert!(body.starts_with("BEGIN:VCALENDAR"));
    feed.assert_async().await;
}

#[tokio::test]
async fn test_feed_server_error_is_feed_fetch_error() {
    let mut server = Server::new_async().await;
    let feed = server
        .mock("GET", "/ics/get")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let fetcher = Fetcher::new(quick_config()).unwrap();
    let result = fetcher
        .fetch_feed(&format!("{}/ics/get", server.url()))
        .await;

    match result {
        Err(ScoutError::FeedFetch { reason, .. }) => assert!(reason.contains("503")),
        other => panic!("expected FeedFetch, got {:?}", other),
    }
    feed.assert_async().await;
}

#[tokio::test]
async fn test_malformed_feed_url_is_feed_fetch_error() {
    let fetcher = Fetcher::new(quick_config()).unwrap();
    let result = fetcher.fetch_feed("not a url").await;
    assert!(matches!(result, Err(ScoutError::FeedFetch { .. })));
}

#[tokio::test]
async fn test_openai_classifier_sends_chat_completion() {
    let mut server = Server::new_async().await;
    let completion = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "food-model",
            "messages": [
                {"role": "system", "content": "Answer true or false."},
                {"role": "user", "content": "Event: Hack Night"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "true"}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let classifier = OpenAiClassifier::new("test-key")
        .unwrap()
        .with_base_url(format!("{}/", server.url()))
        .with_model("food-model");

    let answer = classifier
        .classify(&[
            ChatMessage::system("Answer true or false."),
            ChatMessage::user("Event: Hack Night"),
        ])
        .await
        .unwrap();

    assert_eq!(answer, "true");
    completion.assert_async().await;
}

#[tokio::test]
async fn test_openai_classifier_error_status() {
    let mut server = Server::new_async().await;
    let _limited = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("rate limited")
        .create_async()
        .await;

    let classifier = OpenAiClassifier::new("test-key")
        .unwrap()
        .with_base_url(server.url());
    let result = classifier.classify(&[ChatMessage::user("hello")]).await;

    match result {
        Err(ScoutError::Classify(reason)) => {
            assert!(reason.contains("429"));
            assert!(reason.contains("rate limited"));
        }
        other => panic!("expected Classify error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_classifier_empty_choices() {
    let mut server = Server::new_async().await;
    let _empty = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let classifier = OpenAiClassifier::new("test-key")
        .unwrap()
        .with_base_url(server.url());
    let result = classifier.classify(&[ChatMessage::user("hello")]).await;
    assert!(matches!(result, Err(ScoutError::Classify(_))));
}

#[test]
fn test_openai_classifier_requires_key() {
    assert!(matches!(
        OpenAiClassifier::new("  "),
        Err(ScoutError::Config(_))
    ));
}
