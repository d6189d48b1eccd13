//! Mutation workflow: the create/edit/delete form for a single flight.
//!
//! A submit is a short saga: validate locally, resolve the entered gate
//! number against the known-gates directory (creating the gate when it is
//! unknown), then issue the flight write. The gate step always completes
//! before the flight write is issued, and a gate failure aborts the submit.
//! There is no cancellation; a started submit runs to completion or failure.

use std::sync::Arc;

use chrono::Utc;
use shared::domain::{Flight, FlightId, FlightStatus, FlightZone, Gate};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    api::DeparturesApi, board::FlightBoard, error::EditorError, session::SessionContext,
    ClientEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit,
    Delete,
}

/// Working copy of a flight's editable fields. The gate is a free-text gate
/// number, decoupled from the flight's gate reference until submit time.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightForm {
    pub flight_number: String,
    pub destination: String,
    pub status: FlightStatus,
    pub departure_time: chrono::NaiveDateTime,
    pub zone: FlightZone,
    pub gate_number: String,
    pub temperature: i32,
}

impl FlightForm {
    fn blank() -> Self {
        Self {
            flight_number: String::new(),
            destination: String::new(),
            status: FlightStatus::Planned,
            departure_time: Utc::now().naive_utc(),
            zone: FlightZone::Schengen,
            gate_number: String::new(),
            temperature: 20,
        }
    }

    fn from_flight(flight: &Flight) -> Self {
        Self {
            flight_number: flight.flight_number.clone(),
            destination: flight.destination.clone(),
            status: flight.status,
            departure_time: flight.departure_time,
            zone: flight.zone,
            gate_number: flight
                .gate
                .as_ref()
                .map(|gate| gate.gate_number.clone())
                .unwrap_or_default(),
            temperature: flight.temperature,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Saved(Flight),
    Deleted(FlightId),
}

struct OpenEditor {
    mode: EditorMode,
    target: Option<Flight>,
    form: FlightForm,
}

struct EditorState {
    open: Option<OpenEditor>,
    known_gates: Vec<Gate>,
}

pub struct FlightEditor {
    api: Arc<DeparturesApi>,
    session: Arc<SessionContext>,
    board: Arc<FlightBoard>,
    inner: Mutex<EditorState>,
    events: broadcast::Sender<ClientEvent>,
}

impl FlightEditor {
    pub fn new(
        api: Arc<DeparturesApi>,
        session: Arc<SessionContext>,
        board: Arc<FlightBoard>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            api,
            session,
            board,
            inner: Mutex::new(EditorState {
                open: None,
                known_gates: Vec::new(),
            }),
            events,
        })
    }

    /// Opens the workflow for one flight. Requires a session token: without
    /// one the mutation surface is disabled and no request is issued. `Edit`
    /// and `Delete` demand a flight that already has a server identity;
    /// `Create` starts from a blank form.
    pub async fn open(&self, flight: Option<Flight>, mode: EditorMode) -> Result<(), EditorError> {
        if !self.session.is_authenticated().await {
            return Err(EditorError::NotAuthenticated);
        }

        let target = match mode {
            EditorMode::Create => {
                if flight.is_some() {
                    return Err(EditorError::UnexpectedFlight);
                }
                None
            }
            EditorMode::Edit | EditorMode::Delete => {
                let flight = flight.ok_or(EditorError::MissingFlight { mode })?;
                if flight.id.is_none() {
                    return Err(EditorError::MissingFlightId);
                }
                Some(flight)
            }
        };

        // The known-gates directory is reloaded on every open. A failed load
        // is tolerated: resolution then falls back to creating the gate.
        let known_gates = match self.api.list_gates().await {
            Ok(gates) => gates,
            Err(err) => {
                warn!("editor: gate directory fetch failed: {err:#}");
                Vec::new()
            }
        };

        let form = match &target {
            Some(flight) => FlightForm::from_flight(flight),
            None => FlightForm::blank(),
        };

        let mut state = self.inner.lock().await;
        state.known_gates = known_gates;
        state.open = Some(OpenEditor { mode, target, form });
        Ok(())
    }

    pub async fn cancel(&self) {
        self.inner.lock().await.open = None;
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.open.is_some()
    }

    pub async fn form(&self) -> Option<FlightForm> {
        self.inner
            .lock()
            .await
            .open
            .as_ref()
            .map(|open| open.form.clone())
    }

    pub async fn set_form(&self, form: FlightForm) -> Result<(), EditorError> {
        let mut state = self.inner.lock().await;
        let open = state.open.as_mut().ok_or(EditorError::NotOpen)?;
        open.form = form;
        Ok(())
    }

    /// Runs the submit saga for the open workflow. On success the workflow
    /// closes and the board is signalled to refresh with its current
    /// filters; on failure the workflow stays open and nothing is refreshed.
    pub async fn submit(&self) -> Result<SubmitOutcome, EditorError> {
        let (mode, target, form) = {
            let state = self.inner.lock().await;
            let open = state.open.as_ref().ok_or(EditorError::NotOpen)?;
            (open.mode, open.target.clone(), open.form.clone())
        };

        let outcome = match mode {
            EditorMode::Delete => self.submit_delete(target).await?,
            EditorMode::Create | EditorMode::Edit => {
                self.submit_write(mode, target, form).await?
            }
        };

        self.inner.lock().await.open = None;
        self.board.refresh().await;
        Ok(outcome)
    }

    async fn submit_delete(&self, target: Option<Flight>) -> Result<SubmitOutcome, EditorError> {
        let id = target
            .and_then(|flight| flight.id)
            .ok_or(EditorError::MissingFlightId)?;
        self.api
            .delete_flight(id)
            .await
            .map_err(|err| EditorError::Delete {
                id: id.0,
                message: format!("{err:#}"),
            })?;
        info!(flight_id = id.0, "editor: flight deleted");
        let _ = self.events.send(ClientEvent::FlightDeleted(id));
        Ok(SubmitOutcome::Deleted(id))
    }

    async fn submit_write(
        &self,
        mode: EditorMode,
        target: Option<Flight>,
        form: FlightForm,
    ) -> Result<SubmitOutcome, EditorError> {
        if form.flight_number.trim().is_empty() {
            return Err(EditorError::Validation {
                field: "flight number",
            });
        }
        if form.destination.trim().is_empty() {
            return Err(EditorError::Validation {
                field: "destination",
            });
        }

        let gate = self.resolve_gate(&form.gate_number).await?;

        let flight = Flight {
            id: target.as_ref().and_then(|flight| flight.id),
            flight_number: form.flight_number,
            destination: form.destination,
            status: form.status,
            departure_time: form.departure_time,
            zone: form.zone,
            gate,
            temperature: form.temperature,
        };

        let saved = if mode == EditorMode::Edit {
            let id = flight.id.ok_or(EditorError::MissingFlightId)?;
            self.api.update_flight(id, &flight).await
        } else {
            self.api.create_flight(&flight).await
        }
        .map_err(|err| EditorError::FlightWrite(format!("{err:#}")))?;

        info!(flight_number = %saved.flight_number, "editor: flight saved");
        let _ = self.events.send(ClientEvent::FlightSaved(saved.clone()));
        Ok(SubmitOutcome::Saved(saved))
    }

    /// Gate resolution saga: an empty field clears the reference, an exact
    /// (case-sensitive) match against the known directory reuses that gate,
    /// anything else creates one and adds it to the directory. The lookup
    /// and the create are not atomic against concurrent editors; duplicate
    /// gates under concurrent use are accepted.
    async fn resolve_gate(&self, entered: &str) -> Result<Option<Gate>, EditorError> {
        if entered.is_empty() {
            return Ok(None);
        }

        {
            let state = self.inner.lock().await;
            if let Some(gate) = state
                .known_gates
                .iter()
                .find(|gate| gate.gate_number == entered)
            {
                return Ok(Some(gate.clone()));
            }
        }

        let created =
            self.api
                .create_gate(entered)
                .await
                .map_err(|err| EditorError::GateCreate {
                    gate_number: entered.to_string(),
                    message: format!("{err:#}"),
                })?;
        info!(gate_number = %created.gate_number, "editor: gate created");
        self.inner.lock().await.known_gates.push(created.clone());
        let _ = self.events.send(ClientEvent::GateCreated(created.clone()));
        Ok(Some(created))
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
