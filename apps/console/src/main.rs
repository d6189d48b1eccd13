mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use client_core::{BoardSnapshot, ClientEvent, DeparturesClient, EditorMode, SubmitOutcome};
use shared::domain::{FlightId, FlightStatus, FlightZone};
use tokio::{sync::broadcast, time::timeout};

use crate::config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "departures", about = "Console for the departures board service")]
struct Args {
    /// Base URL of the departures service; overrides config file and env.
    #[arg(long)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Clear the persisted session token.
    Logout,
    /// Show a page of the departures board.
    Board {
        /// Flight-number search token.
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        zone: Option<FlightZone>,
        #[arg(long)]
        status: Option<FlightStatus>,
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Create a flight.
    Add {
        #[arg(long)]
        flight_number: String,
        #[arg(long)]
        destination: String,
        #[arg(long, default_value_t = FlightStatus::Planned)]
        status: FlightStatus,
        /// Departure time, e.g. 2025-03-30T12:30:00. Defaults to now.
        #[arg(long)]
        departure: Option<NaiveDateTime>,
        #[arg(long, default_value_t = FlightZone::Schengen)]
        zone: FlightZone,
        /// Gate number; looked up among known gates, created when missing.
        #[arg(long)]
        gate: Option<String>,
        #[arg(long, default_value_t = 20)]
        temperature: i32,
    },
    /// Update an existing flight.
    Edit {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        flight_number: Option<String>,
        #[arg(long)]
        destination: Option<String>,
        #[arg(long)]
        status: Option<FlightStatus>,
        #[arg(long)]
        departure: Option<NaiveDateTime>,
        #[arg(long)]
        zone: Option<FlightZone>,
        /// Gate number; an empty string clears the gate reference.
        #[arg(long)]
        gate: Option<String>,
        #[arg(long)]
        temperature: Option<i32>,
    },
    /// Delete a flight.
    Remove {
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let settings = load_settings();
    let server_url = args.server_url.unwrap_or(settings.server_url);
    tracing::debug!(server_url = %server_url, "console: starting");

    let store = storage::SessionDb::new(&settings.session_db).await?;
    store.health_check().await?;
    let client = DeparturesClient::connect(&server_url, Arc::new(store)).await?;

    match args.command {
        Command::Login { username, password } => {
            client.login(&username, &password).await?;
            println!("Signed in as {username}; session token persisted.");
        }
        Command::Logout => {
            client.logout().await?;
            println!("Signed out.");
        }
        Command::Board {
            search,
            zone,
            status,
            page,
        } => {
            let board = client.board();
            let mut rx = client.subscribe_events();

            let mut touched = false;
            if let Some(search) = search {
                board.set_search(search).await;
                touched = true;
            }
            if zone.is_some() {
                board.set_zone_filter(zone).await;
                touched = true;
            }
            if status.is_some() {
                board.set_status_filter(status).await;
                touched = true;
            }
            if !touched {
                board.refresh().await;
            }
            let mut snapshot = wait_for_board(&mut rx).await?;

            if page > 0 {
                let target = page.min(snapshot.total_pages.saturating_sub(1));
                if target != snapshot.page {
                    board.set_page(target).await;
                    snapshot = wait_for_board(&mut rx).await?;
                }
            }

            if let Some(message) = &snapshot.last_error {
                println!("warning: last fetch failed: {message}");
            }
            print_board(&snapshot);
        }
        Command::Add {
            flight_number,
            destination,
            status,
            departure,
            zone,
            gate,
            temperature,
        } => {
            let editor = client.editor();
            editor.open(None, EditorMode::Create).await?;
            let mut form = editor.form().await.context("editor did not open")?;
            form.flight_number = flight_number;
            form.destination = destination;
            form.status = status;
            if let Some(departure) = departure {
                form.departure_time = departure;
            }
            form.zone = zone;
            if let Some(gate) = gate {
                form.gate_number = gate;
            }
            form.temperature = temperature;
            editor.set_form(form).await?;

            if let SubmitOutcome::Saved(flight) = editor.submit().await? {
                println!(
                    "Saved flight {} (id {})",
                    flight.flight_number,
                    flight.id.map(|id| id.0).unwrap_or_default()
                );
            }
        }
        Command::Edit {
            id,
            flight_number,
            destination,
            status,
            departure,
            zone,
            gate,
            temperature,
        } => {
            let flight = client.api().get_flight(FlightId(id)).await?;
            let editor = client.editor();
            editor.open(Some(flight), EditorMode::Edit).await?;
            let mut form = editor.form().await.context("editor did not open")?;
            if let Some(flight_number) = flight_number {
                form.flight_number = flight_number;
            }
            if let Some(destination) = destination {
                form.destination = destination;
            }
            if let Some(status) = status {
                form.status = status;
            }
            if let Some(departure) = departure {
                form.departure_time = departure;
            }
            if let Some(zone) = zone {
                form.zone = zone;
            }
            if let Some(gate) = gate {
                form.gate_number = gate;
            }
            if let Some(temperature) = temperature {
                form.temperature = temperature;
            }
            editor.set_form(form).await?;

            if let SubmitOutcome::Saved(flight) = editor.submit().await? {
                println!("Updated flight {}", flight.flight_number);
            }
        }
        Command::Remove { id } => {
            let flight = client.api().get_flight(FlightId(id)).await?;
            let editor = client.editor();
            editor.open(Some(flight), EditorMode::Delete).await?;
            let SubmitOutcome::Deleted(deleted) = editor.submit().await? else {
                return Err(anyhow!("delete submit reported an unexpected outcome"));
            };
            println!("Deleted flight {}", deleted.0);
        }
    }

    client.close().await;
    Ok(())
}

async fn wait_for_board(rx: &mut broadcast::Receiver<ClientEvent>) -> Result<BoardSnapshot> {
    timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(ClientEvent::BoardUpdated(snapshot)) => break Ok(snapshot),
                Ok(_) => continue,
                Err(err) => break Err(anyhow!("event stream closed: {err}")),
            }
        }
    })
    .await
    .context("timed out waiting for the board to settle")?
}

fn print_board(snapshot: &BoardSnapshot) {
    if snapshot.flights.is_empty() {
        println!("No flights match the current filters.");
    } else {
        println!(
            "{:<10} {:<18} {:<10} {:<20} {:<13} {:<6} {:>5}",
            "FLIGHT", "DESTINATION", "STATUS", "DEPARTURE", "ZONE", "GATE", "TEMP"
        );
        for flight in &snapshot.flights {
            let gate = flight
                .gate
                .as_ref()
                .map(|gate| gate.gate_number.as_str())
                .unwrap_or("-");
            println!(
                "{:<10} {:<18} {:<10} {:<20} {:<13} {:<6} {:>4}C",
                flight.flight_number,
                flight.destination,
                flight.status.to_string(),
                flight.departure_time.to_string(),
                flight.zone.to_string(),
                gate,
                flight.temperature
            );
        }
    }
    println!("Page {} of {}", snapshot.page + 1, snapshot.total_pages);
}
