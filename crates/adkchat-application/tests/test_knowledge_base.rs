use std::sync::Arc;
use std::time::Duration;

use adkchat_application::KnowledgeBase;
use adkchat_core::knowledge::KbFileStatus;
use adkchat_interaction::KnowledgeBaseClient;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn knowledge_base(server: &MockServer) -> KnowledgeBase {
    let client = KnowledgeBaseClient::new(format!("{}/api/ddocstore", server.uri()));
    KnowledgeBase::new(Arc::new(client), Duration::from_millis(10))
}

#[tokio::test]
async fn upload_then_poll_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ddocstore/upload/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"doc_uuid": "d1", "workflow_id": "w1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ddocstore/workflows/w1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ddocstore/workflows/w1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .mount(&server)
        .await;

    let kb = knowledge_base(&server);
    let file = kb.upload("a.pdf", b"pdf".to_vec(), "application/pdf").await.unwrap();
    assert_eq!(file.doc_uuid, "d1");
    assert_eq!(file.status, KbFileStatus::Processing);
    assert_eq!(kb.active_workflows().await, vec!["w1"]);

    kb.watch("w1", CancellationToken::new()).await;
    assert_eq!(kb.find("d1").await.unwrap().status, KbFileStatus::Success);
}

#[tokio::test]
async fn delete_success_removes_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ddocstore/upload/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"doc_uuid": "d1", "workflow_id": "w1"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/ddocstore/documents/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"workflow_id": "w2"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ddocstore/workflows/w2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "SUCCESS"})))
        .mount(&server)
        .await;

    let kb = knowledge_base(&server);
    kb.upload("a.pdf", b"pdf".to_vec(), "application/pdf").await.unwrap();
    assert_eq!(kb.delete("d1").await.unwrap(), "w2");
    assert_eq!(kb.find("d1").await.unwrap().status, KbFileStatus::Deleting);

    kb.watch("w2", CancellationToken::new()).await;
    assert!(kb.files().await.is_empty());
}

#[tokio::test]
async fn failures_are_recorded_on_the_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ddocstore/upload/"))
        .respond_with(ResponseTemplate::new(413).set_body_json(json!({"detail": "too large"})))
        .mount(&server)
        .await;

    let kb = knowledge_base(&server);
    assert!(kb.upload("big.pdf", vec![0; 8], "application/pdf").await.is_err());
    let files = kb.files().await;
    assert_eq!(files[0].status, KbFileStatus::UploadError);
    assert_eq!(files[0].error_message.as_deref(), Some("too large (413)"));

    assert!(kb.delete("missing").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn polling_error_marks_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ddocstore/upload/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"doc_uuid": "d1", "workflow_id": "w1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ddocstore/workflows/w1/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "workflow store offline"})))
        .mount(&server)
        .await;

    let kb = knowledge_base(&server);
    kb.upload("a.pdf", b"pdf".to_vec(), "application/pdf").await.unwrap();
    kb.watch("w1", CancellationToken::new()).await;

    let file = kb.find("d1").await.unwrap();
    assert_eq!(file.status, KbFileStatus::Error);
    assert_eq!(
        file.error_message.as_deref(),
        Some("Polling failed: workflow store offline (500)")
    );
}

#[tokio::test]
async fn cancelled_watch_returns_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ddocstore/workflows/w1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})))
        .expect(0)
        .mount(&server)
        .await;

    let kb = knowledge_base(&server);
    let token = CancellationToken::new();
    token.cancel();
    kb.watch("w1", token).await;
}
