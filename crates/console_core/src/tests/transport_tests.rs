use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::domain::{Direction, ServiceRequestId};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::{event_channel::SseDecoder, test_support::request_id};

#[derive(Clone, Default)]
struct ServerState {
    calls: Arc<Mutex<Vec<FloorCallRequest>>>,
    floors: Arc<Mutex<Vec<(ServiceRequestId, FloorSelectionSubmission)>>>,
}

async fn handle_configuration() -> Json<Configuration> {
    Json(Configuration {
        total_floors: 3,
        elevator_names: vec!["Car 1".into(), "ECar 2".into()],
    })
}

async fn handle_service(
    State(state): State<ServerState>,
    Json(request): Json<FloorCallRequest>,
) -> Json<RiderServiceRequest> {
    state.calls.lock().await.push(request);
    Json(RiderServiceRequest {
        id: request_id(42),
        direction: request.direction,
        origination_floor: request.origination_floor,
    })
}

async fn handle_floors(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(submission): Json<FloorSelectionSubmission>,
) -> Response {
    let id = ServiceRequestId::new(id);
    if id != submission.rider_service_request.id {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status": 400,
                "error": "Bad Request",
                "message": "service request id mismatch",
            })),
        )
            .into_response();
    }
    state.floors.lock().await.push((id, submission.clone()));
    Json(submission).into_response()
}

async fn handle_events() -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let events = vec![
        Ok(Event::default().data(r#"{"carName":"Car 1","status":"MOVING","currentFloor":2}"#)),
        Ok(Event::default().data(r#"{"carName":"Car 1","status":"AVAILABLE","currentFloor":3}"#)),
    ];
    Sse::new(futures::stream::iter(events))
}

async fn spawn_backend(router: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

async fn spawn_elevator_backend() -> (String, ServerState) {
    let state = ServerState::default();
    let router = Router::new()
        .route("/configuration", get(handle_configuration))
        .route("/service", post(handle_service))
        .route("/service/:id/floors", post(handle_floors))
        .route("/service/events", get(handle_events))
        .with_state(state.clone());
    (spawn_backend(router).await, state)
}

#[tokio::test]
async fn fetches_configuration() {
    let (server_url, _) = spawn_elevator_backend().await;
    let backend = HttpBackend::new(&server_url).expect("backend");

    let conf = backend.fetch_configuration().await.expect("configuration");
    assert_eq!(conf.total_floors, 3);
    assert_eq!(conf.elevator_names.len(), 2);
    assert_eq!(conf.elevator_names[0].as_str(), "Car 1");
}

#[tokio::test]
async fn configuration_failure_reports_status() {
    let router = Router::new().route(
        "/configuration",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let server_url = spawn_backend(router).await;
    let backend = HttpBackend::new(&server_url).expect("backend");

    let err = backend.fetch_configuration().await.expect_err("must fail");
    assert!(
        matches!(err, ConsoleError::UnexpectedStatus { status: 503, .. }),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");

    let backend = HttpBackend::new(&format!("http://{addr}")).expect("backend");
    let err = backend.fetch_configuration().await.expect_err("must fail");
    assert!(matches!(err, ConsoleError::Transport { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn submits_call_request_body() {
    let (server_url, state) = spawn_elevator_backend().await;
    let backend = HttpBackend::new(&server_url).expect("backend");
    let request = FloorCallRequest {
        direction: Direction::Ascending,
        origination_floor: 1,
    };

    let accepted = backend.submit_call(&request).await.expect("submit");
    assert_eq!(accepted.id, request_id(42));
    assert_eq!(accepted.origination_floor, 1);
    assert_eq!(*state.calls.lock().await, vec![request]);
}

#[tokio::test]
async fn submits_floors_to_per_request_endpoint() {
    let (server_url, state) = spawn_elevator_backend().await;
    let backend = HttpBackend::new(&server_url).expect("backend");
    let submission = FloorSelectionSubmission {
        rider_service_request: RiderServiceRequest {
            id: request_id(1),
            direction: Direction::Ascending,
            origination_floor: 1,
        },
        requested_floors: vec![3],
    };

    let echoed = backend.submit_floors(&submission).await.expect("submit");
    assert_eq!(echoed, submission);
    assert_eq!(
        *state.floors.lock().await,
        vec![(request_id(1), submission)]
    );
}

#[tokio::test]
async fn opaque_request_id_is_encoded_as_one_path_segment() {
    let (server_url, state) = spawn_elevator_backend().await;
    let backend = HttpBackend::new(&format!("{server_url}/")).expect("backend");
    let submission = FloorSelectionSubmission {
        rider_service_request: RiderServiceRequest {
            id: ServiceRequestId::from("req 7"),
            direction: Direction::Descending,
            origination_floor: 3,
        },
        requested_floors: vec![1, 2],
    };

    let echoed = backend.submit_floors(&submission).await.expect("submit");
    assert_eq!(echoed, submission);
    assert_eq!(
        *state.floors.lock().await,
        vec![(ServiceRequestId::from("req 7"), submission)]
    );
}

#[tokio::test]
async fn rejected_submission_carries_backend_message() {
    let router = Router::new().route(
        "/service/:id/floors",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Bad Request", "message": "service request id mismatch"})),
            )
        }),
    );
    let server_url = spawn_backend(router).await;
    let backend = HttpBackend::new(&server_url).expect("backend");
    let submission = FloorSelectionSubmission {
        rider_service_request: RiderServiceRequest {
            id: request_id(1),
            direction: Direction::Descending,
            origination_floor: 2,
        },
        requested_floors: vec![1],
    };

    let err = backend.submit_floors(&submission).await.expect_err("must fail");
    assert!(
        err.to_string().contains("Bad Request: service request id mismatch"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn push_stream_yields_sse_frames() {
    let (server_url, _) = spawn_elevator_backend().await;
    let backend = HttpBackend::new(&server_url).expect("backend");

    let mut stream = backend.open_push_stream().await.expect("open");
    let mut decoder = SseDecoder::new();
    let mut events = Vec::new();
    while let Some(chunk) = stream.next().await {
        events.extend(decoder.feed(&chunk.expect("chunk")));
    }

    assert_eq!(
        events,
        vec![
            r#"{"carName":"Car 1","status":"MOVING","currentFloor":2}"#,
            r#"{"carName":"Car 1","status":"AVAILABLE","currentFloor":3}"#,
        ]
    );
}

#[test]
fn base_url_accepts_shorthand_and_prefixes() {
    assert_eq!(
        parse_base_url("127.0.0.1:8080").expect("url").as_str(),
        "http://127.0.0.1:8080/"
    );
    assert_eq!(
        parse_base_url("https://lift.example/console")
            .expect("url")
            .join("service")
            .expect("join")
            .as_str(),
        "https://lift.example/console/service"
    );
    assert!(matches!(
        parse_base_url("http://"),
        Err(ConsoleError::InvalidServerUrl { .. })
    ));
}
