use innomed_stream::prelude::*;
use innomed_stream::TransportError;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(frames: &[&str]) -> String {
    frames.iter().map(|f| format!("data: {f}\n\n")).collect()
}

fn sse_response(frames: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(sse_body(frames))
}

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(ClientConfig::new(server.uri())).expect("backend")
}

#[tokio::test]
async fn streams_frames_into_final_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream-query"))
        .and(query_param("molecule", "Aspirin"))
        .and(query_param("prompt", "market size & growth?"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse_response(&[
            r#"{"type":"status","data":"running agents"}"#,
            r#"{"type":"agent","agent":"iqvia","data":{"market_size":"1.2B"}}"#,
            r#"{not json"#,
            r#"{"type":"llm_token","data":"Hel"}"#,
            r#"{"type":"llm_token","data":"lo!"}"#,
            r#"{"type":"done","result":{"molecule":"Aspirin","mit":{"innovation_score":82}}}"#,
        ]))
        .mount(&server)
        .await;

    let (controller, mut observer) = backend(&server).into_controller().expect("controller");
    controller.start(SessionRequest::new("Aspirin", "market size & growth?").expect("request"));

    let mut changes = Vec::new();
    let final_model = loop {
        match observer.next_update().await.expect("update") {
            SessionUpdate::ModelChanged { model, .. } => changes.push(model),
            SessionUpdate::Completed { model, .. } => break model,
            SessionUpdate::Failed { failure, .. } => panic!("unexpected failure: {failure}"),
            SessionUpdate::Started { .. } => {}
        }
    };

    assert_eq!(changes.len(), 4);
    let last = changes.last().expect("changes");
    assert_eq!(last.token_buffer(), "Hello!");
    assert_eq!(last.agent("iqvia"), Some(&json!({"market_size":"1.2B"})));
    assert_eq!(
        final_model.to_json(),
        json!({"molecule":"Aspirin","mit":{"innovation_score":82}})
    );
    assert_eq!(controller.state(), SessionState::Completed);
}

#[tokio::test]
async fn stream_ending_without_done_fails_unexpectedly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream-query"))
        .respond_with(sse_response(&[r#"{"type":"status","data":"working"}"#]))
        .mount(&server)
        .await;

    let (controller, mut observer) = backend(&server).into_controller().expect("controller");
    controller.start(SessionRequest::new("Aspirin", "trials").expect("request"));

    let err = observer.wait_for_terminal().await.expect_err("should fail");
    assert_eq!(
        err,
        ClientError::Session(SessionFailure::ChannelClosedUnexpectedly)
    );
    assert_eq!(
        observer.latest_model().and_then(|m| m.section("status")),
        Some(&json!("working"))
    );
}

#[tokio::test]
async fn error_status_on_open_is_channel_open_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream-query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let (controller, mut observer) = backend(&server).into_controller().expect("controller");
    controller.start(SessionRequest::new("Aspirin", "patents").expect("request"));

    let err = observer.wait_for_terminal().await.expect_err("should fail");
    assert!(matches!(
        err,
        ClientError::Session(SessionFailure::ChannelOpenFailed { ref message }) if message.contains("500")
    ));
    assert_eq!(controller.state(), SessionState::Failed);
}

#[tokio::test]
async fn single_shot_query_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({"molecule":"Aspirin","prompt":"fto risk"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": {"molecule":"Aspirin","fto_analysis":{"risk":"low"}}
        })))
        .mount(&server)
        .await;

    let model = backend(&server)
        .query(&SessionRequest::new("Aspirin", "fto risk").expect("request"))
        .await
        .expect("query");
    assert_eq!(
        model.to_json(),
        json!({"molecule":"Aspirin","fto_analysis":{"risk":"low"}})
    );
}

#[tokio::test]
async fn single_shot_error_envelope_fails_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"status":"error","message":"unknown molecule"})),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .query(&SessionRequest::new("Nope", "anything").expect("request"))
        .await
        .expect_err("should fail");
    assert_eq!(err, ClientError::Envelope("unknown molecule".into()));
}

#[tokio::test]
async fn single_shot_plain_server_error_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .query(&SessionRequest::new("Aspirin", "q").expect("request"))
        .await
        .expect_err("should fail");
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Http { status: 502, .. })
    ));
}

#[tokio::test]
async fn artifact_fetch_and_download() {
    let server = MockServer::start().await;
    let pdf = b"%PDF-1.4 fake report".to_vec();
    Mock::given(method("GET"))
        .and(path("/report/Aspirin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(pdf.clone()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report/Unknown"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let bytes = backend.fetch_artifact("Aspirin").await.expect("fetch");
    assert_eq!(bytes.as_ref(), pdf.as_slice());

    let dir = tempfile::tempdir().expect("tempdir");
    let saved = backend
        .download_artifact("Aspirin", dir.path())
        .await
        .expect("download");
    assert_eq!(saved, dir.path().join("Aspirin_report.pdf"));
    assert_eq!(std::fs::read(&saved).expect("read"), pdf);

    assert!(matches!(
        backend.fetch_artifact("Unknown").await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn mit_lookup_returns_json_or_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mit/Aspirin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"innovation_score":82})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mit/Other"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error":"MIT not found"})))
        .mount(&server)
        .await;

    let backend = backend(&server);
    assert_eq!(
        backend.fetch_mit("Aspirin").await.expect("mit"),
        json!({"innovation_score":82})
    );
    assert!(matches!(
        backend.fetch_mit("Other").await,
        Err(ClientError::NotFound(_))
    ));
}
