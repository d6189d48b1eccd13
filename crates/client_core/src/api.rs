//! Typed wrappers over the remote departures REST service.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use shared::{
    domain::{Flight, FlightId, Gate},
    protocol::{
        FlightQuery, GateDirectory, LoginRequest, NewGateRequest, PagedFlights, TokenResponse,
    },
};
use url::Url;

use crate::session::SessionContext;

pub struct DeparturesApi {
    http: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl DeparturesApi {
    pub fn new(base_url: &str, session: Arc<SessionContext>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid server url '{base_url}'"))?;
        Ok(Self {
            http: Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            session,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attaches the bearer credential when the session holds one. Absence is
    /// tolerated; authorization is enforced server-side.
    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn list_flights(&self, query: &FlightQuery) -> Result<(Vec<Flight>, u32)> {
        let envelope: PagedFlights = self
            .http
            .get(self.endpoint("/api/flights"))
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.into_page())
    }

    pub async fn get_flight(&self, id: FlightId) -> Result<Flight> {
        let flight = self
            .http
            .get(self.endpoint(&format!("/api/flights/{}", id.0)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(flight)
    }

    pub async fn list_gates(&self) -> Result<Vec<Gate>> {
        let directory: GateDirectory = self
            .http
            .get(self.endpoint("/api/gates"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(directory.into_gates())
    }

    pub async fn create_gate(&self, gate_number: &str) -> Result<Gate> {
        let request = self.http.post(self.endpoint("/api/gates")).json(&NewGateRequest {
            gate_number: gate_number.to_string(),
        });
        let gate = self
            .authorized(request)
            .await
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(gate)
    }

    pub async fn create_flight(&self, flight: &Flight) -> Result<Flight> {
        let request = self.http.post(self.endpoint("/api/flights")).json(flight);
        let saved = self
            .authorized(request)
            .await
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(saved)
    }

    pub async fn update_flight(&self, id: FlightId, flight: &Flight) -> Result<Flight> {
        let request = self
            .http
            .put(self.endpoint(&format!("/api/flights/{}", id.0)))
            .json(flight);
        let saved = self
            .authorized(request)
            .await
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(saved)
    }

    pub async fn delete_flight(&self, id: FlightId) -> Result<()> {
        let request = self
            .http
            .delete(self.endpoint(&format!("/api/flights/{}", id.0)));
        self.authorized(request)
            .await
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Exchanges credentials for an opaque session token. The token is not
    /// inspected client-side.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let response: TokenResponse = self
            .http
            .post(self.endpoint("/api/auth/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.token)
    }
}
