//! Integration tests for the screener HTTP client and flow.
//!
//! Each test spins up an Axum mock backend on a random port and drives the
//! real `HttpScreenerApi` + `ScreenerFlow` against it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use screener_client::config::ApiConfig;
use screener_client::error::{ApiError, FlowError};
use screener_client::screener::render::{NO_RECOMMENDATIONS_TEXT, render_state};
use screener_client::screener::{
    AnswerOutcome, FlowPhase, FlowState, HttpScreenerApi, IdGenerator, ScreenerFlow,
    ScreenerProvider,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Deterministic ids: `{prefix}-0`, `{prefix}-1`, ...
struct CountingIds {
    prefix: &'static str,
    next: AtomicUsize,
}

impl CountingIds {
    fn new(prefix: &'static str) -> Arc<Self> {
        Arc::new(Self {
            prefix,
            next: AtomicUsize::new(0),
        })
    }
}

impl IdGenerator for CountingIds {
    fn generate(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// A recorded request: headers plus JSON body (Null for GETs).
#[derive(Clone)]
struct Recorded {
    headers: HeaderMap,
    body: Value,
}

/// Mock backend. Status queues default to 200 once drained.
struct Backend {
    screener: Value,
    screener_statuses: Mutex<VecDeque<u16>>,
    answer_statuses: Mutex<VecDeque<u16>>,
    results: Vec<String>,
    screener_requests: Mutex<Vec<Recorded>>,
    answer_requests: Mutex<Vec<Recorded>>,
}

impl Backend {
    fn new(screener: Value) -> Self {
        Self {
            screener,
            screener_statuses: Mutex::new(VecDeque::new()),
            answer_statuses: Mutex::new(VecDeque::new()),
            results: Vec::new(),
            screener_requests: Mutex::new(Vec::new()),
            answer_requests: Mutex::new(Vec::new()),
        }
    }

    fn screener_statuses(self, statuses: &[u16]) -> Self {
        *self.screener_statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    fn answer_statuses(self, statuses: &[u16]) -> Self {
        *self.answer_statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    fn results(mut self, results: &[&str]) -> Self {
        self.results = results.iter().map(|s| s.to_string()).collect();
        self
    }

    fn screener_requests(&self) -> Vec<Recorded> {
        self.screener_requests.lock().unwrap().clone()
    }

    fn answer_requests(&self) -> Vec<Recorded> {
        self.answer_requests.lock().unwrap().clone()
    }
}

fn next_status(queue: &Mutex<VecDeque<u16>>) -> StatusCode {
    let code = queue.lock().unwrap().pop_front().unwrap_or(200);
    StatusCode::from_u16(code).unwrap()
}

async fn get_screener(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.screener_requests.lock().unwrap().push(Recorded {
        headers,
        body: Value::Null,
    });
    let status = next_status(&backend.screener_statuses);
    if !status.is_success() {
        return (status, "internal error").into_response();
    }
    Json(backend.screener.clone()).into_response()
}

async fn post_answers(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend
        .answer_requests
        .lock()
        .unwrap()
        .push(Recorded { headers, body });
    let status = next_status(&backend.answer_statuses);
    if !status.is_success() {
        return (status, "internal error").into_response();
    }
    Json(json!({ "results": backend.results })).into_response()
}

/// Start the mock backend on a random port, return its port.
async fn start_backend(backend: Arc<Backend>) -> u16 {
    let app = Router::new()
        .route("/api/screener", get(get_screener))
        .route("/api/answers", post(post_answers))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    port
}

/// Screener document with `n` questions on a No/Yes scale.
fn screener_json(n: usize) -> Value {
    let questions: Vec<Value> = (1..=n)
        .map(|i| json!({"question_id": format!("q{i}"), "title": format!("Question {i}?")}))
        .collect();
    json!({
        "id": "abcd-123",
        "name": "BPDS",
        "disorder": "Cross-Cutting",
        "content": {
            "sections": [{
                "type": "standard",
                "title": "During the past TWO (2) WEEKS, how often have you been bothered by the following problems?",
                "answers": [
                    {"title": "No", "value": 0},
                    {"title": "Yes", "value": 1}
                ],
                "questions": questions
            }],
            "display_name": "BDS"
        },
        "full_name": "Blueprint Diagnostic Screener"
    })
}

async fn start_flow(backend: Backend) -> (Arc<Backend>, ScreenerFlow) {
    let backend = Arc::new(backend);
    let port = start_backend(Arc::clone(&backend)).await;
    let config = ApiConfig::with_base_url(&format!("http://127.0.0.1:{port}")).unwrap();
    let api = Arc::new(HttpScreenerApi::new(config, CountingIds::new("corr")));
    let flow = ScreenerFlow::start(api.clone(), api, &*CountingIds::new("session")).await;
    (backend, flow)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing {name} header"))
        .to_str()
        .unwrap()
}

// ── Flow Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn completes_flow_against_backend() {
    timeout(TEST_TIMEOUT, async {
        let (backend, flow) =
            start_flow(Backend::new(screener_json(3)).results(&["PHQ-9", "ASSIST"])).await;
        assert_eq!(flow.phase().await, FlowPhase::InProgress);

        assert_eq!(
            flow.submit_answer(1).await.unwrap(),
            AnswerOutcome::Advanced { current_index: 1 }
        );
        flow.submit_answer(0).await.unwrap();
        let outcome = flow.submit_answer(1).await.unwrap();
        assert_eq!(
            outcome,
            AnswerOutcome::Completed {
                recommendations: vec!["PHQ-9".into(), "ASSIST".into()],
            }
        );

        let posts = backend.answer_requests();
        assert_eq!(posts.len(), 1);
        assert_eq!(
            posts[0].body,
            json!({
                "session_id": "session-0",
                "answers": [
                    {"question_id": "q1", "value": 1},
                    {"question_id": "q2", "value": 0},
                    {"question_id": "q3", "value": 1}
                ],
                "isComplete": true
            })
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn every_call_gets_its_own_correlation_id() {
    timeout(TEST_TIMEOUT, async {
        let (backend, flow) = start_flow(Backend::new(screener_json(1))).await;
        flow.submit_answer(1).await.unwrap();

        let gets = backend.screener_requests();
        let posts = backend.answer_requests();
        let (get, post) = (&gets[0], &posts[0]);

        assert_eq!(header(&get.headers, "content-type"), "application/json");
        assert_eq!(header(&post.headers, "content-type"), "application/json");

        let get_id = header(&get.headers, "x-correlation-id");
        let post_id = header(&post.headers, "x-correlation-id");
        assert_eq!(get_id, "corr-0");
        assert_eq!(post_id, "corr-1");
        assert_ne!(get_id, flow.session_id());
        assert_ne!(post_id, flow.session_id());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn fetch_500_then_retry() {
    timeout(TEST_TIMEOUT, async {
        let (backend, flow) =
            start_flow(Backend::new(screener_json(2)).screener_statuses(&[500])).await;

        match flow.state().await {
            FlowState::Error { message, .. } => assert_eq!(message, "Failed to fetch screener"),
            other => panic!("expected error, got {other:?}"),
        }

        assert_eq!(flow.retry().await.unwrap(), FlowPhase::InProgress);
        assert_eq!(backend.screener_requests().len(), 2);
        assert_eq!(flow.session_id(), "session-0");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn submission_500_keeps_answers_then_retry_resubmits() {
    timeout(TEST_TIMEOUT, async {
        let (backend, flow) = start_flow(
            Backend::new(screener_json(3))
                .answer_statuses(&[500])
                .results(&["ASRM"]),
        )
        .await;

        flow.submit_answer(1).await.unwrap();
        flow.submit_answer(1).await.unwrap();
        let err = flow.submit_answer(0).await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::Submission(ApiError::Status { status: 500, .. })
        ));

        let state = flow.state().await;
        match &state {
            FlowState::Error { message, .. } => {
                assert_eq!(message, "Failed to submit answers. Please try again.")
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(state.answers().unwrap().len(), 3);

        assert_eq!(flow.retry().await.unwrap(), FlowPhase::Completed);
        let posts = backend.answer_requests();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].body, posts[1].body);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn empty_results_render_no_recommendations() {
    timeout(TEST_TIMEOUT, async {
        let (backend, flow) = start_flow(Backend::new(screener_json(1))).await;
        flow.submit_answer(0).await.unwrap();

        let state = flow.state().await;
        match &state {
            FlowState::Completed {
                recommendations, ..
            } => assert!(recommendations.is_empty()),
            other => panic!("expected completed, got {other:?}"),
        }
        assert!(render_state(&state, None).contains(NO_RECOMMENDATIONS_TEXT));

        // Further answers never reach the backend.
        assert_eq!(flow.submit_answer(1).await.unwrap(), AnswerOutcome::Ignored);
        assert_eq!(backend.answer_requests().len(), 1);
    })
    .await
    .expect("test timed out");
}

// ── Client Tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn relative_paths_resolve_against_origin() {
    timeout(TEST_TIMEOUT, async {
        let backend = Arc::new(Backend::new(screener_json(2)));
        let port = start_backend(Arc::clone(&backend)).await;
        let config = ApiConfig {
            base_url: None,
            origin: format!("http://127.0.0.1:{port}"),
        };
        let api = HttpScreenerApi::new(config, CountingIds::new("corr"));

        let screener = api.fetch_screener().await.unwrap();
        assert_eq!(screener.total_questions(), 2);
        assert_eq!(backend.screener_requests().len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn structurally_invalid_screener_is_a_fetch_failure() {
    timeout(TEST_TIMEOUT, async {
        let (backend, flow) = start_flow(Backend::new(screener_json(0))).await;
        assert_eq!(flow.phase().await, FlowPhase::Error);

        let err = flow.retry().await.unwrap_err();
        assert!(matches!(err, FlowError::Fetch(ApiError::InvalidScreener(_))));
        assert_eq!(backend.screener_requests().len(), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn http_client_returns_document_as_served() {
    timeout(TEST_TIMEOUT, async {
        let backend = Arc::new(Backend::new(screener_json(0)));
        let port = start_backend(Arc::clone(&backend)).await;
        let config = ApiConfig::with_base_url(&format!("http://127.0.0.1:{port}")).unwrap();
        let api = HttpScreenerApi::new(config, CountingIds::new("corr"));

        // Structural checks belong to the flow, not the transport.
        let screener = api.fetch_screener().await.unwrap();
        assert_eq!(screener.total_questions(), 0);
        assert!(screener.validate().is_err());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn undecodable_body_is_decode_error() {
    timeout(TEST_TIMEOUT, async {
        let backend = Arc::new(Backend::new(json!({"unexpected": true})));
        let port = start_backend(Arc::clone(&backend)).await;
        let config = ApiConfig::with_base_url(&format!("http://127.0.0.1:{port}")).unwrap();
        let api = HttpScreenerApi::new(config, CountingIds::new("corr"));

        let err = api.fetch_screener().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }), "got {err:?}");
    })
    .await
    .expect("test timed out");
}
