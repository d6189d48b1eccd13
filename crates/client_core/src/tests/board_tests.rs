use super::*;
use std::collections::{HashMap, VecDeque};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, time::timeout};

use crate::session::{MemorySessionStore, SessionContext};

#[derive(Clone)]
struct BoardServerState {
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    delays_ms: Arc<Mutex<VecDeque<u64>>>,
    fail: Arc<Mutex<bool>>,
    empty_body: Arc<Mutex<bool>>,
    total_pages: Arc<Mutex<u32>>,
}

async fn list_flights(
    State(state): State<BoardServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    state.requests.lock().await.push(params.clone());

    let delay = state.delays_ms.lock().await.pop_front();
    if let Some(ms) = delay {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    if *state.fail.lock().await {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response();
    }
    if *state.empty_body.lock().await {
        return Json(json!({})).into_response();
    }

    // Encode which filters the server saw into the payload so tests can tell
    // responses of different queries apart.
    let destination = if params.contains_key("status") {
        "status-filtered"
    } else if params.contains_key("zone") {
        "zone-filtered"
    } else if params.contains_key("flightNumber") {
        "search-filtered"
    } else {
        "unfiltered"
    };
    let flight_number = params
        .get("flightNumber")
        .cloned()
        .unwrap_or_else(|| "LO123".to_string());
    let total_pages = *state.total_pages.lock().await;

    Json::<Value>(json!({
        "_embedded": {
            "flightList": [{
                "id": 1,
                "flightNumber": flight_number,
                "destination": destination,
                "status": "PLANNED",
                "departureTime": "2025-03-30T12:30:00",
                "zone": "SCHENGEN",
                "temperature": 11
            }]
        },
        "page": {"size": 10, "totalElements": 1, "totalPages": total_pages, "number": 0}
    }))
    .into_response()
}

async fn spawn_flight_server() -> anyhow::Result<(String, BoardServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = BoardServerState {
        requests: Arc::new(Mutex::new(Vec::new())),
        delays_ms: Arc::new(Mutex::new(VecDeque::new())),
        fail: Arc::new(Mutex::new(false)),
        empty_body: Arc::new(Mutex::new(false)),
        total_pages: Arc::new(Mutex::new(1)),
    };
    let app = Router::new()
        .route("/api/flights", get(list_flights))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

const TEST_DEBOUNCE: Duration = Duration::from_millis(80);

async fn test_board(server_url: &str) -> (Arc<FlightBoard>, broadcast::Receiver<ClientEvent>) {
    let session = SessionContext::initialize(Arc::new(MemorySessionStore::default()))
        .await
        .expect("session");
    let api = Arc::new(DeparturesApi::new(server_url, session).expect("api"));
    let (events, rx) = broadcast::channel(64);
    let board = FlightBoard::with_debounce(api, events, TEST_DEBOUNCE);
    (board, rx)
}

async fn next_board_update(rx: &mut broadcast::Receiver<ClientEvent>) -> BoardSnapshot {
    timeout(Duration::from_secs(2), async {
        loop {
            if let ClientEvent::BoardUpdated(snapshot) = rx.recv().await.expect("event stream") {
                break snapshot;
            }
        }
    })
    .await
    .expect("board update timeout")
}

#[tokio::test]
async fn refresh_replaces_the_view_model_wholesale() {
    let (url, state) = spawn_flight_server().await.expect("server");
    *state.total_pages.lock().await = 3;
    let (board, mut rx) = test_board(&url).await;

    board.refresh().await;
    let snapshot = next_board_update(&mut rx).await;

    assert_eq!(snapshot.flights.len(), 1);
    assert_eq!(snapshot.total_pages, 3);
    assert_eq!(snapshot.page, 0);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.last_error, None);

    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].get("page").map(String::as_str), Some("0"));
    assert_eq!(requests[0].get("size").map(String::as_str), Some("10"));
    assert!(!requests[0].contains_key("flightNumber"));
}

#[tokio::test]
async fn filter_change_resets_page_to_zero() {
    let (url, state) = spawn_flight_server().await.expect("server");
    *state.total_pages.lock().await = 3;
    let (board, mut rx) = test_board(&url).await;

    board.refresh().await;
    next_board_update(&mut rx).await;
    board.set_page(2).await;
    let snapshot = next_board_update(&mut rx).await;
    assert_eq!(snapshot.page, 2);

    board.set_zone_filter(Some(FlightZone::Schengen)).await;
    let snapshot = next_board_update(&mut rx).await;
    assert_eq!(snapshot.page, 0);

    let requests = state.requests.lock().await;
    let last = requests.last().expect("at least one request");
    assert_eq!(last.get("page").map(String::as_str), Some("0"));
    assert_eq!(last.get("zone").map(String::as_str), Some("SCHENGEN"));
}

#[tokio::test]
async fn rapid_typing_coalesces_into_one_request_for_the_final_text() {
    let (url, state) = spawn_flight_server().await.expect("server");
    let (board, mut rx) = test_board(&url).await;

    board.set_search("AB").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    board.set_search("ABC").await;

    let snapshot = next_board_update(&mut rx).await;
    assert_eq!(snapshot.flights[0].flight_number, "ABC");

    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].get("flightNumber").map(String::as_str), Some("ABC"));
}

#[tokio::test]
async fn typing_after_the_quiet_period_issues_a_second_request() {
    let (url, state) = spawn_flight_server().await.expect("server");
    let (board, mut rx) = test_board(&url).await;

    board.set_search("AB").await;
    next_board_update(&mut rx).await;
    board.set_search("ABC").await;
    next_board_update(&mut rx).await;

    let requests = state.requests.lock().await;
    let searches: Vec<_> = requests
        .iter()
        .filter_map(|r| r.get("flightNumber").map(String::as_str))
        .collect();
    assert_eq!(searches, vec!["AB", "ABC"]);
}

#[tokio::test]
async fn filter_change_during_quiet_period_restarts_the_pending_request() {
    let (url, state) = spawn_flight_server().await.expect("server");
    let (board, mut rx) = test_board(&url).await;

    board.set_search("AB").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    board.set_zone_filter(Some(FlightZone::Schengen)).await;

    next_board_update(&mut rx).await;

    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].get("flightNumber").map(String::as_str), Some("AB"));
    assert_eq!(requests[0].get("zone").map(String::as_str), Some("SCHENGEN"));
    assert_eq!(requests[0].get("page").map(String::as_str), Some("0"));
}

#[tokio::test]
async fn stale_response_never_overwrites_a_newer_query() {
    let (url, state) = spawn_flight_server().await.expect("server");
    state.delays_ms.lock().await.push_back(300);
    let (board, mut rx) = test_board(&url).await;

    // Slow zone-only fetch, superseded by a fast status fetch.
    board.set_zone_filter(Some(FlightZone::Schengen)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    board.set_status_filter(Some(FlightStatus::Delayed)).await;

    let snapshot = next_board_update(&mut rx).await;
    assert_eq!(snapshot.flights[0].destination, "status-filtered");
    assert_eq!(snapshot.last_error, None);

    // Give the superseded response time to arrive; it must not surface.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(rx.try_recv().is_err());
    let settled = board.snapshot().await;
    assert_eq!(settled.flights[0].destination, "status-filtered");
}

#[tokio::test]
async fn fetch_failure_keeps_last_known_good_and_sets_the_error_indicator() {
    let (url, state) = spawn_flight_server().await.expect("server");
    let (board, mut rx) = test_board(&url).await;

    board.refresh().await;
    let good = next_board_update(&mut rx).await;
    assert_eq!(good.flights.len(), 1);

    *state.fail.lock().await = true;
    board.refresh().await;
    let failed = next_board_update(&mut rx).await;
    assert!(failed.last_error.is_some());
    assert_eq!(failed.flights, good.flights);
    assert!(!failed.loading);

    *state.fail.lock().await = false;
    board.refresh().await;
    let recovered = next_board_update(&mut rx).await;
    assert_eq!(recovered.last_error, None);
}

#[tokio::test]
async fn page_navigation_clamps_at_both_edges() {
    let (url, state) = spawn_flight_server().await.expect("server");
    *state.total_pages.lock().await = 2;
    let (board, mut rx) = test_board(&url).await;

    board.refresh().await;
    next_board_update(&mut rx).await;

    // Previous at page 0 is a no-op: no new request.
    board.prev_page().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.requests.lock().await.len(), 1);

    board.next_page().await;
    let snapshot = next_board_update(&mut rx).await;
    assert_eq!(snapshot.page, 1);

    // Next at the last page is a no-op.
    board.next_page().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.requests.lock().await.len(), 2);

    board.prev_page().await;
    let snapshot = next_board_update(&mut rx).await;
    assert_eq!(snapshot.page, 0);

    // An out-of-range jump clamps to the last page.
    board.set_page(99).await;
    let snapshot = next_board_update(&mut rx).await;
    assert_eq!(snapshot.page, 1);
    let requests = state.requests.lock().await;
    assert_eq!(
        requests.last().and_then(|r| r.get("page")).map(String::as_str),
        Some("1")
    );
}

#[tokio::test]
async fn empty_envelope_defaults_to_a_single_empty_page() {
    let (url, state) = spawn_flight_server().await.expect("server");
    *state.empty_body.lock().await = true;
    let (board, mut rx) = test_board(&url).await;

    board.refresh().await;
    let snapshot = next_board_update(&mut rx).await;
    assert!(snapshot.flights.is_empty());
    assert_eq!(snapshot.total_pages, 1);
}

#[tokio::test]
async fn shutdown_cancels_the_inflight_request() {
    let (url, state) = spawn_flight_server().await.expect("server");
    state.delays_ms.lock().await.push_back(300);
    let (board, mut rx) = test_board(&url).await;

    board.refresh().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    board.shutdown().await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(rx.try_recv().is_err());
    let snapshot = board.snapshot().await;
    assert!(!snapshot.loading);
    assert!(snapshot.flights.is_empty());
}
