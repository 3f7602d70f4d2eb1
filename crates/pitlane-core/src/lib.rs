//! pitlane Core Library
//!
//! This crate provides a state-sync client for a microcontroller race
//! controller (start-sequence traffic light, lap counter, racer name
//! display, indicator LED) that exposes a small JSON HTTP API.
//!
//! # Architecture
//!
//! - **Device**: source of truth; this crate only mirrors its state
//!
//! The client polls status endpoints, compares each result with the last
//! snapshot of the same family, and emits an event only when it changed.
//!
//! # Quick Start
//!
//! ```text
//! let client = StateSyncClient::from_config(&Config::load()?)?;
//!
//! // Issue a command; the response becomes the local LED state
//! client.send_command(&Endpoint::LedOn).await?;
//!
//! // Poll and reconcile
//! client.on_tick(&Endpoint::LapStatus).await;
//! ```
//!
//! # Modules
//!
//! - `sync`: client, connection state machine, poll loop
//! - `endpoint`: device API paths grouped into families
//! - `models`: snapshots and typed status views
//! - `transport`: request seam and the HTTP implementation
//! - `error`: client error taxonomy
//! - `config`: application configuration

pub mod config;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod sync;
pub mod transport;

pub use config::{Config, WatchConfig};
pub use endpoint::{Endpoint, EndpointFamily, RacerName, RACER_NAME_MAX_LEN};
pub use error::{ClientError, ClientResult, TransportError};
pub use models::{LedStatus, RaceStatus, StatusSnapshot, TrafficLightState, TrafficLightStatus};
pub use sync::{ConnectionState, StateSyncClient, SyncEvent, TickOutcome};
pub use transport::{HttpTransport, Transport};
