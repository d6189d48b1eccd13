//! Client-side core of the departures console: session state, the listing
//! query controller, and the flight mutation workflow over the remote REST
//! service. Rendering, routing, and the service itself are out of scope.

use std::sync::Arc;

use anyhow::Result;
use shared::domain::{Flight, FlightId, Gate};
use tokio::sync::broadcast;

pub mod api;
pub mod board;
pub mod editor;
pub mod error;
pub mod session;

pub use api::DeparturesApi;
pub use board::{BoardSnapshot, FlightBoard, PAGE_SIZE, SEARCH_DEBOUNCE};
pub use editor::{EditorMode, FlightEditor, FlightForm, SubmitOutcome};
pub use error::EditorError;
pub use session::{MemorySessionStore, SessionContext, SessionStore};

#[derive(Debug, Clone)]
pub enum ClientEvent {
    BoardUpdated(BoardSnapshot),
    FlightSaved(Flight),
    FlightDeleted(FlightId),
    GateCreated(Gate),
    SessionChanged { authenticated: bool },
}

/// Wires the three components on one event channel: the session context
/// (leaf), the board controller, and the editor, which signals the board to
/// refresh after successful writes.
pub struct DeparturesClient {
    session: Arc<SessionContext>,
    api: Arc<DeparturesApi>,
    board: Arc<FlightBoard>,
    editor: Arc<FlightEditor>,
    events: broadcast::Sender<ClientEvent>,
}

impl DeparturesClient {
    pub async fn connect(base_url: &str, store: Arc<dyn SessionStore>) -> Result<Self> {
        let session = SessionContext::initialize(store).await?;
        let api = Arc::new(DeparturesApi::new(base_url, Arc::clone(&session))?);
        let (events, _) = broadcast::channel(256);
        let board = FlightBoard::new(Arc::clone(&api), events.clone());
        let editor = FlightEditor::new(
            Arc::clone(&api),
            Arc::clone(&session),
            Arc::clone(&board),
            events.clone(),
        );
        Ok(Self {
            session,
            api,
            board,
            editor,
            events,
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn api(&self) -> &Arc<DeparturesApi> {
        &self.api
    }

    pub fn board(&self) -> &Arc<FlightBoard> {
        &self.board
    }

    pub fn editor(&self) -> &Arc<FlightEditor> {
        &self.editor
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let token = self.api.login(username, password).await?;
        self.session.set_token(token).await?;
        let _ = self
            .events
            .send(ClientEvent::SessionChanged {
                authenticated: true,
            });
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.clear_token().await?;
        let _ = self
            .events
            .send(ClientEvent::SessionChanged {
                authenticated: false,
            });
        Ok(())
    }

    /// Tears the client down, cancelling any in-flight board request.
    pub async fn close(&self) {
        self.board.shutdown().await;
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
