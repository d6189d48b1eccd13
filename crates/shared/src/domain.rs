use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(FlightId);
id_newtype!(GateId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Planned,
    CheckIn,
    Delayed,
    Cancelled,
}

impl FlightStatus {
    pub const ALL: [FlightStatus; 4] = [
        FlightStatus::Planned,
        FlightStatus::CheckIn,
        FlightStatus::Delayed,
        FlightStatus::Cancelled,
    ];

    /// Literal wire name, as transmitted in query parameters and bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            FlightStatus::Planned => "PLANNED",
            FlightStatus::CheckIn => "CHECK_IN",
            FlightStatus::Delayed => "DELAYED",
            FlightStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown flight status '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightZone {
    Schengen,
    NonSchengen,
}

impl FlightZone {
    pub const ALL: [FlightZone; 2] = [FlightZone::Schengen, FlightZone::NonSchengen];

    pub fn as_str(self) -> &'static str {
        match self {
            FlightZone::Schengen => "SCHENGEN",
            FlightZone::NonSchengen => "NON_SCHENGEN",
        }
    }
}

impl fmt::Display for FlightZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|zone| zone.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown flight zone '{s}'"))
    }
}

/// A departure gate. Flights reference gates, they never own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gate {
    pub id: GateId,
    pub gate_number: String,
}

/// One departure as held by the remote service. `id` is absent until the
/// service has assigned one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FlightId>,
    pub flight_number: String,
    pub destination: String,
    pub status: FlightStatus,
    pub departure_time: NaiveDateTime,
    pub zone: FlightZone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
    pub temperature: i32,
}
