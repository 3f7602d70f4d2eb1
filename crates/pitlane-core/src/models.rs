//! Data models for pitlane
//!
//! The device answers every call with a JSON envelope: `success`, an optional
//! `message`, and whatever state fields the endpoint family exposes. The
//! envelope is stripped and the rest becomes a [`StatusSnapshot`], an opaque
//! value compared by its canonical serialization. Typed views over the known
//! payloads are provided for display.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::endpoint::Endpoint;
use crate::error::{ClientError, ClientResult};

/// A parsed response envelope
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Envelope {
    pub success: bool,
    pub message: Option<String>,
    /// Every field other than `success` and `message`
    pub state: Map<String, Value>,
}

impl Envelope {
    /// Split a response body into envelope and state fields
    pub fn parse(endpoint: &Endpoint, body: Value) -> ClientResult<Self> {
        let Value::Object(mut fields) = body else {
            return Err(ClientError::Decode {
                endpoint: endpoint.to_string(),
                details: "response is not a JSON object".to_string(),
            });
        };

        let success = match fields.remove("success") {
            Some(Value::Bool(success)) => success,
            _ => {
                return Err(ClientError::Decode {
                    endpoint: endpoint.to_string(),
                    details: "missing boolean 'success' field".to_string(),
                })
            }
        };

        let message = match fields.remove("message") {
            Some(Value::String(message)) => Some(message),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            success,
            message,
            state: fields,
        })
    }

    /// Turn `success: false` into an application error
    pub fn into_state(
        self,
        endpoint: &Endpoint,
    ) -> ClientResult<(Map<String, Value>, Option<String>)> {
        if self.success {
            Ok((self.state, self.message))
        } else {
            Err(ClientError::Application {
                endpoint: endpoint.to_string(),
                message: self
                    .message
                    .unwrap_or_else(|| "Device reported an unspecified error".to_string()),
            })
        }
    }
}

/// The most recently fetched state of one endpoint family
///
/// Equality is structural: two snapshots are equal when their payloads
/// serialize identically. The fetch time is not part of equality.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    data: Map<String, Value>,
    fetched_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data,
            fetched_at: Utc::now(),
        }
    }

    /// Build a snapshot from a JSON object literal (other values give an empty snapshot)
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(data) => Self::new(data),
            _ => Self::new(Map::new()),
        }
    }

    /// Canonical serialization used for change detection
    ///
    /// Object keys are sorted, so field order on the wire does not matter.
    pub fn canonical(&self) -> String {
        serde_json::to_string(&self.data).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.data
    }

    /// LED state, either top-level or nested in the race status
    pub fn led_is_on(&self) -> Option<bool> {
        self.data
            .get("is_on")
            .and_then(Value::as_bool)
            .or_else(|| {
                self.data
                    .get("race_status")
                    .and_then(|race| race.pointer("/led_status/is_on"))
                    .and_then(Value::as_bool)
            })
    }

    pub fn race_status(&self) -> Option<RaceStatus> {
        self.view("race_status")
    }

    pub fn traffic_light(&self) -> Option<TrafficLightStatus> {
        self.view("traffic_light_status")
    }

    /// Racer name, either top-level or nested in the race status
    pub fn racer_name(&self) -> Option<String> {
        self.data
            .get("racer_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.race_status().and_then(|race| race.racer_name))
    }

    fn view<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

impl PartialEq for StatusSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

/// Indicator LED state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedStatus {
    pub is_on: bool,
}

/// Lap counter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceStatus {
    pub current_laps: u32,
    pub max_laps: u32,
    pub remaining_laps: u32,
    pub is_completed: bool,
    pub progress_percentage: f64,
    #[serde(default)]
    pub is_race_started: bool,
    #[serde(default)]
    pub is_race_running: Option<bool>,
    #[serde(default)]
    pub racer_name: Option<String>,
    #[serde(default)]
    pub led_status: Option<LedStatus>,
}

/// Start sequence lights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficLightStatus {
    /// Raw state string as reported by the device
    pub state: String,
    #[serde(default)]
    pub red_on: bool,
    #[serde(default)]
    pub yellow_on: bool,
    #[serde(default)]
    pub green_on: bool,
    #[serde(default)]
    pub blinking_active: bool,
}

impl TrafficLightStatus {
    pub fn phase(&self) -> TrafficLightState {
        TrafficLightState::parse(&self.state)
    }
}

/// Phase of the start sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficLightState {
    Off,
    /// Pre-race: all lights blinking
    Blinking,
    Red,
    Yellow,
    Green,
    /// A state string this client doesn't know
    Unknown,
}

impl TrafficLightState {
    pub fn parse(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "off" => TrafficLightState::Off,
            "blinking" => TrafficLightState::Blinking,
            "red" => TrafficLightState::Red,
            "yellow" => TrafficLightState::Yellow,
            "green" => TrafficLightState::Green,
            _ => TrafficLightState::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrafficLightState::Off => "off",
            TrafficLightState::Blinking => "blinking",
            TrafficLightState::Red => "red",
            TrafficLightState::Yellow => "yellow",
            TrafficLightState::Green => "green",
            TrafficLightState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TrafficLightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
