//! Listing query controller for the departures board.
//!
//! Owns the search/filter/page state, derives the canonical list query from
//! it, and supervises at most one logically current list request. Every
//! input change bumps a generation; the previous in-flight task is aborted
//! and a completion is applied only while its generation is still current,
//! so the view model never regresses to a superseded query's data.

use std::sync::Arc;
use std::time::Duration;

use shared::{
    domain::{Flight, FlightStatus, FlightZone},
    protocol::FlightQuery,
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{api::DeparturesApi, ClientEvent};

pub const PAGE_SIZE: u32 = 10;
/// Quiet period after the last keystroke before a search query is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// View model for the current page, replaced wholesale on every settled
/// fetch. `flights` keeps its last known-good value across failures.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub flights: Vec<Flight>,
    pub page: u32,
    pub total_pages: u32,
    pub loading: bool,
    pub last_error: Option<String>,
}

struct BoardState {
    search: String,
    zone: Option<FlightZone>,
    status: Option<FlightStatus>,
    page: u32,
    total_pages: u32,
    flights: Vec<Flight>,
    loading: bool,
    last_error: Option<String>,
    generation: u64,
    inflight: Option<JoinHandle<()>>,
}

impl BoardState {
    fn query(&self) -> FlightQuery {
        FlightQuery {
            page: self.page,
            size: PAGE_SIZE,
            flight_number: (!self.search.is_empty()).then(|| self.search.clone()),
            zone: self.zone,
            status: self.status,
        }
    }

    fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            flights: self.flights.clone(),
            page: self.page,
            total_pages: self.total_pages,
            loading: self.loading,
            last_error: self.last_error.clone(),
        }
    }
}

pub struct FlightBoard {
    api: Arc<DeparturesApi>,
    debounce: Duration,
    inner: Mutex<BoardState>,
    events: broadcast::Sender<ClientEvent>,
}

impl FlightBoard {
    pub fn new(api: Arc<DeparturesApi>, events: broadcast::Sender<ClientEvent>) -> Arc<Self> {
        Self::with_debounce(api, events, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(
        api: Arc<DeparturesApi>,
        events: broadcast::Sender<ClientEvent>,
        debounce: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            debounce,
            inner: Mutex::new(BoardState {
                search: String::new(),
                zone: None,
                status: None,
                page: 0,
                total_pages: 1,
                flights: Vec::new(),
                loading: false,
                last_error: None,
                generation: 0,
                inflight: None,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn set_search(self: &Arc<Self>, text: impl Into<String>) {
        let text = text.into();
        {
            let mut state = self.inner.lock().await;
            if state.search == text {
                return;
            }
            state.search = text;
            state.page = 0;
        }
        self.supersede(false).await;
    }

    pub async fn set_zone_filter(self: &Arc<Self>, zone: Option<FlightZone>) {
        {
            let mut state = self.inner.lock().await;
            if state.zone == zone {
                return;
            }
            state.zone = zone;
            state.page = 0;
        }
        self.supersede(false).await;
    }

    pub async fn set_status_filter(self: &Arc<Self>, status: Option<FlightStatus>) {
        {
            let mut state = self.inner.lock().await;
            if state.status == status {
                return;
            }
            state.status = status;
            state.page = 0;
        }
        self.supersede(false).await;
    }

    /// Navigates to `page`, clamped into `[0, total_pages - 1]`. A clamp
    /// that lands on the current page is a no-op.
    pub async fn set_page(self: &Arc<Self>, page: u32) {
        {
            let mut state = self.inner.lock().await;
            let clamped = page.min(state.total_pages.saturating_sub(1));
            if clamped == state.page {
                return;
            }
            state.page = clamped;
        }
        self.supersede(false).await;
    }

    pub async fn next_page(self: &Arc<Self>) {
        let target = {
            let state = self.inner.lock().await;
            if state.page + 1 >= state.total_pages {
                return;
            }
            state.page + 1
        };
        self.set_page(target).await;
    }

    pub async fn prev_page(self: &Arc<Self>) {
        let target = {
            let state = self.inner.lock().await;
            if state.page == 0 {
                return;
            }
            state.page - 1
        };
        self.set_page(target).await;
    }

    /// Re-issues the current query immediately, bypassing the search
    /// debounce (the quiet period applies to keystrokes, not to refresh
    /// signals).
    pub async fn refresh(self: &Arc<Self>) {
        self.supersede(true).await;
    }

    /// Aborts any in-flight request; for component teardown.
    pub async fn shutdown(&self) {
        let mut state = self.inner.lock().await;
        state.generation += 1;
        if let Some(task) = state.inflight.take() {
            task.abort();
        }
        state.loading = false;
    }

    /// Starts a new request generation for the current state. The previous
    /// in-flight task (debounce timer included) is aborted; its settle is
    /// additionally fenced by the generation check in case it already passed
    /// the abort point.
    async fn supersede(self: &Arc<Self>, force_immediate: bool) {
        let mut state = self.inner.lock().await;
        state.generation += 1;
        let generation = state.generation;
        let query = state.query();
        let delay =
            (!force_immediate && !state.search.is_empty()).then_some(self.debounce);
        state.loading = true;
        if let Some(task) = state.inflight.take() {
            task.abort();
        }

        debug!(
            generation,
            page = query.page,
            debounced = delay.is_some(),
            "board: scheduling list fetch"
        );
        let board = Arc::clone(self);
        state.inflight = Some(tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let result = board.api.list_flights(&query).await;
            board.settle(generation, result).await;
        }));
    }

    async fn settle(&self, generation: u64, result: anyhow::Result<(Vec<Flight>, u32)>) {
        let snapshot = {
            let mut state = self.inner.lock().await;
            if state.generation != generation {
                // Superseded while in flight: discard without touching the
                // view model or the error indicator.
                debug!(
                    generation,
                    current = state.generation,
                    "board: dropping stale list response"
                );
                return;
            }
            state.loading = false;
            state.inflight = None;
            match result {
                Ok((flights, total_pages)) => {
                    debug!(
                        generation,
                        flights = flights.len(),
                        total_pages,
                        "board: page applied"
                    );
                    state.flights = flights;
                    state.total_pages = total_pages;
                    state.last_error = None;
                }
                Err(err) => {
                    warn!("board: list fetch failed: {err:#}");
                    state.last_error = Some(err.to_string());
                }
            }
            state.snapshot()
        };
        let _ = self.events.send(ClientEvent::BoardUpdated(snapshot));
    }
}

#[cfg(test)]
#[path = "tests/board_tests.rs"]
mod tests;
