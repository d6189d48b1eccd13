use serde::{Deserialize, Serialize};

use crate::domain::{Flight, FlightStatus, FlightZone, Gate};

/// Canonical list query derived from the board state. Serializes directly
/// into the `/api/flights` query string; absent filters are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightQuery {
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<FlightZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FlightStatus>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub number: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddedFlights {
    #[serde(rename = "flightList", default)]
    flight_list: Vec<Flight>,
}

/// Paginated envelope returned by `GET /api/flights`: the item collection is
/// nested under `_embedded.flightList` next to a `page` descriptor. Both
/// parts are optional on the wire; an empty body is an empty first-of-one
/// page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagedFlights {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedFlights>,
    #[serde(default)]
    page: Option<PageMetadata>,
}

impl PagedFlights {
    /// Flattens the envelope into the item list and the total page count,
    /// defaulting a zero or absent `totalPages` to 1.
    pub fn into_page(self) -> (Vec<Flight>, u32) {
        let flights = self.embedded.map(|e| e.flight_list).unwrap_or_default();
        let total_pages = self
            .page
            .map(|p| p.total_pages)
            .filter(|&total| total > 0)
            .unwrap_or(1);
        (flights, total_pages)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddedGates {
    #[serde(rename = "gateList", default)]
    gate_list: Vec<Gate>,
}

/// Envelope returned by `GET /api/gates`, same embedded-list convention.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateDirectory {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedGates>,
}

impl GateDirectory {
    pub fn into_gates(self) -> Vec<Gate> {
        self.embedded.map(|e| e.gate_list).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGateRequest {
    pub gate_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
