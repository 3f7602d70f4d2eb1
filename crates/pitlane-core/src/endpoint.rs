//! Device API endpoints
//!
//! Every path the controller serves, grouped into families. A family is the
//! unit under which snapshots are stored and requests are sequenced: a command
//! and a status read in the same family overwrite the same local state.

use std::fmt;

use serde::Serialize;

use crate::error::{ClientError, ClientResult};

/// Longest racer name the display firmware accepts
pub const RACER_NAME_MAX_LEN: usize = 10;

/// A group of endpoints sharing one piece of device state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointFamily {
    Led,
    Lap,
    TrafficLight,
    Racer,
}

impl EndpointFamily {
    pub const ALL: [EndpointFamily; 4] = [
        EndpointFamily::Led,
        EndpointFamily::Lap,
        EndpointFamily::TrafficLight,
        EndpointFamily::Racer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointFamily::Led => "led",
            EndpointFamily::Lap => "lap",
            EndpointFamily::TrafficLight => "traffic-light",
            EndpointFamily::Racer => "racer",
        }
    }

    /// The read-only endpoint that reports this family's state
    pub fn status_endpoint(self) -> Endpoint {
        match self {
            EndpointFamily::Led => Endpoint::LedStatus,
            EndpointFamily::Lap => Endpoint::LapStatus,
            EndpointFamily::TrafficLight => Endpoint::TrafficLightStatus,
            EndpointFamily::Racer => Endpoint::RacerName,
        }
    }
}

impl fmt::Display for EndpointFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A racer name that passed validation
///
/// Surrounding whitespace is dropped. The name is non-empty and at most
/// [`RACER_NAME_MAX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RacerName(String);

impl RacerName {
    pub fn new(name: &str) -> ClientResult<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ClientError::InvalidRacerName {
                name: name.to_string(),
                reason: "name is empty",
            });
        }
        if trimmed.chars().count() > RACER_NAME_MAX_LEN {
            return Err(ClientError::InvalidRacerName {
                name: name.to_string(),
                reason: "name is longer than 10 characters",
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RacerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single device API endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    LedOn,
    LedOff,
    LedToggle,
    LedStatus,
    LapIncrement,
    LapReset,
    LapStatus,
    TrafficLightStart,
    TrafficLightStop,
    TrafficLightPrevious,
    TrafficLightPreviousStop,
    TrafficLightStatus,
    RacerName,
    SetRacerName(RacerName),
    RacerDisplay,
}

impl Endpoint {
    /// Build a racer-name update, validating the name
    pub fn set_racer_name(name: &str) -> ClientResult<Self> {
        RacerName::new(name).map(Endpoint::SetRacerName)
    }

    /// Request path, without query string
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::LedOn => "/api/led/on",
            Endpoint::LedOff => "/api/led/off",
            Endpoint::LedToggle => "/api/led/toggle",
            Endpoint::LedStatus => "/api/led/status",
            Endpoint::LapIncrement => "/api/lap/increment",
            Endpoint::LapReset => "/api/lap/reset",
            Endpoint::LapStatus => "/api/lap/status",
            Endpoint::TrafficLightStart => "/api/traffic-light/start",
            Endpoint::TrafficLightStop => "/api/traffic-light/stop",
            Endpoint::TrafficLightPrevious => "/api/traffic-light/previous",
            Endpoint::TrafficLightPreviousStop => "/api/traffic-light/previous-stop",
            Endpoint::TrafficLightStatus => "/api/traffic-light/status",
            Endpoint::RacerName => "/api/racer/name",
            Endpoint::SetRacerName(_) => "/api/racer/name/set",
            Endpoint::RacerDisplay => "/api/racer/display",
        }
    }

    /// Query parameters, unencoded
    pub fn query(&self) -> Vec<(&'static str, &str)> {
        match self {
            Endpoint::SetRacerName(name) => vec![("name", name.as_str())],
            _ => Vec::new(),
        }
    }

    pub fn family(&self) -> EndpointFamily {
        match self {
            Endpoint::LedOn | Endpoint::LedOff | Endpoint::LedToggle | Endpoint::LedStatus => {
                EndpointFamily::Led
            }
            Endpoint::LapIncrement | Endpoint::LapReset | Endpoint::LapStatus => {
                EndpointFamily::Lap
            }
            Endpoint::TrafficLightStart
            | Endpoint::TrafficLightStop
            | Endpoint::TrafficLightPrevious
            | Endpoint::TrafficLightPreviousStop
            | Endpoint::TrafficLightStatus => EndpointFamily::TrafficLight,
            Endpoint::RacerName | Endpoint::SetRacerName(_) | Endpoint::RacerDisplay => {
                EndpointFamily::Racer
            }
        }
    }

    /// Whether calling this endpoint changes device state
    pub fn is_command(&self) -> bool {
        !matches!(
            self,
            Endpoint::LedStatus
                | Endpoint::LapStatus
                | Endpoint::TrafficLightStatus
                | Endpoint::RacerName
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())?;
        for (i, (key, value)) in self.query().into_iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}
