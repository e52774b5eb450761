use std::sync::Arc;

use adkchat_application::{AppContext, HistoryLoader, MessageStore, SessionManager};
use adkchat_core::error::{ChatError, SessionError};
use adkchat_core::session::SessionRef;
use adkchat_core::store::{InMemoryKeyValueStore, KeyValueStore, SESSION_ID_KEY, USER_ID_KEY};
use adkchat_interaction::AgentApiClient;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context_for(server: &MockServer, store: Arc<InMemoryKeyValueStore>) -> AppContext {
    let client = Arc::new(AgentApiClient::new(server.uri()));
    let sessions = Arc::new(SessionManager::new(store, client.clone()));
    AppContext::new(client, sessions)
}

#[tokio::test]
async fn history_attaches_images_and_skips_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apps/ds/users/u1/sessions/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"id": "q", "author": "user", "content": {"parts": [{"text": "plot"}]}},
                {"id": "a", "author": "agent",
                 "content": {"parts": [{"text": "Here you go"}]},
                 "actions": {"artifactDelta": {"one.png": 0, "two.png": 0}}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apps/ds/users/u1/sessions/s1/artifacts/one.png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inlineData": {"data": "iVBO-w", "mimeType": "image/png"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apps/ds/users/u1/sessions/s1/artifacts/two.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = SessionRef::new("ds", "u1", "s1");
    let loader = HistoryLoader::new(Arc::new(AgentApiClient::new(server.uri())));
    let messages = loader.load(&session).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.image_urls.is_empty()));

    let store = MessageStore::new();
    store.replace_all(messages.clone()).await;
    let attached = loader.attach_images(&session, &messages, &store).await;
    assert_eq!(attached, 1);

    let shown = store.snapshot().await;
    assert!(shown[0].image_urls.is_empty());
    assert_eq!(shown[1].content, "Here you go");
    assert_eq!(shown[1].image_urls, vec!["data:image/png;base64,iVBO+w=="]);
}

#[tokio::test]
async fn images_for_a_replaced_transcript_are_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apps/ds/users/u1/sessions/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"id": "a", "author": "agent",
                 "content": {"parts": [{"text": "chart"}]},
                 "actions": {"artifactDelta": {"one.png": 0}}}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apps/ds/users/u1/sessions/s1/artifacts/one.png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "inlineData": {"data": "iVBO", "mimeType": "image/png"}
        })))
        .mount(&server)
        .await;

    let session = SessionRef::new("ds", "u1", "s1");
    let loader = HistoryLoader::new(Arc::new(AgentApiClient::new(server.uri())));
    let messages = loader.load(&session).await.unwrap();

    // Another session took over the store before the image arrived.
    let store = MessageStore::new();
    assert_eq!(loader.attach_images(&session, &messages, &store).await, 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn init_selects_first_app_and_records_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list-apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ds", "search"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let mut context = context_for(&server, Arc::new(InMemoryKeyValueStore::new()));
    context.init(None).await;
    assert_eq!(context.selected_app(), Some("ds"));
    assert!(!context.select_app("unknown"));
    assert_eq!(context.selected_app(), Some("ds"));
    assert!(context.select_app("search"));

    Mock::given(method("GET"))
        .and(path("/list-apps"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "down"})))
        .mount(&server)
        .await;
    context.init(None).await;
    assert!(context.apps().is_empty());
    assert_eq!(context.app_list_error(), Some("down (503)"));
}

#[tokio::test]
async fn new_session_failure_keeps_current_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list-apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ds"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/apps/ds/users/u1/sessions/.+$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryKeyValueStore::with_entries([(USER_ID_KEY, "u1")]));
    let mut context = context_for(&server, store.clone());
    context.init(None).await;
    context.load_session_context("old", None).await.unwrap();

    let err = context.start_new_session("ds").await.unwrap_err();
    assert!(matches!(
        err,
        ChatError::Session(SessionError::BackendCreationFailed { .. })
    ));
    assert_eq!(context.current_session_id(), Some("old"));
    assert_eq!(store.get(SESSION_ID_KEY).await.unwrap().as_deref(), Some("old"));
}

#[tokio::test]
async fn load_session_context_switches_app_and_lists_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list-apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["ds", "search"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apps/search/users/u1/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "s9", "appName": "search", "userId": "u1", "lastUpdateTime": 5.0, "events": []}
        ])))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryKeyValueStore::with_entries([(USER_ID_KEY, "u1")]));
    let mut context = context_for(&server, store);
    context.init(None).await;

    context.load_session_context("s9", Some("search")).await.unwrap();
    assert_eq!(context.selected_app(), Some("search"));
    assert_eq!(context.current_session_id(), Some("s9"));

    let recent = context.refresh_recent_sessions().await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].title(), "Session s9");
}

#[tokio::test]
async fn load_session_context_without_app_fails() {
    let server = MockServer::start().await;
    let mut context = context_for(&server, Arc::new(InMemoryKeyValueStore::new()));
    let err = context.load_session_context("s1", None).await.unwrap_err();
    assert!(matches!(err, ChatError::Session(SessionError::MissingAppName)));
}
