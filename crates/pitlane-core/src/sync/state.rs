//! Sync bookkeeping
//!
//! Connection state machine, poll-cycle counter and per-family request
//! sequencing. None of these do I/O.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::endpoint::EndpointFamily;

/// Device connection state
///
/// Starts at `Connecting`; any successful response moves to `Connected`, any
/// failure to `Disconnected`. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No response seen yet
    #[default]
    Connecting,
    /// Last request got an answer
    Connected,
    /// Last request failed
    Disconnected,
}

impl ConnectionState {
    pub fn on_success(self) -> Self {
        ConnectionState::Connected
    }

    pub fn on_failure(self) -> Self {
        ConnectionState::Disconnected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts ticks of the fastest timer
#[derive(Debug, Default)]
pub struct PollCycle {
    count: u64,
}

impl PollCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tick, returning its zero-based index
    pub fn advance(&mut self) -> u64 {
        let current = self.count;
        self.count += 1;
        current
    }

    /// Number of ticks started so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether a task running every `every` ticks is due on tick `cycle`
    ///
    /// `every == 0` means never. Tick 0 runs everything.
    pub fn is_due(cycle: u64, every: u32) -> bool {
        every != 0 && cycle % u64::from(every) == 0
    }
}

/// Identifies one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    family: EndpointFamily,
    sequence: u64,
}

impl RequestToken {
    pub fn family(&self) -> EndpointFamily {
        self.family
    }
}

/// Hands out request tokens; only the newest token per family may apply
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: HashMap<EndpointFamily, u64>,
    next_sequence: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request, superseding any earlier one for the family
    pub fn begin(&mut self, family: EndpointFamily) -> RequestToken {
        self.next_sequence += 1;
        self.latest.insert(family, self.next_sequence);
        RequestToken {
            family,
            sequence: self.next_sequence,
        }
    }

    /// Whether no newer request was issued for this token's family
    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.latest.get(&token.family) == Some(&token.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_transitions() {
        let state = ConnectionState::default();
        assert_eq!(state, ConnectionState::Connecting);

        assert_eq!(state.on_success(), ConnectionState::Connected);
        assert_eq!(state.on_failure(), ConnectionState::Disconnected);
        assert_eq!(
            ConnectionState::Disconnected.on_success(),
            ConnectionState::Connected
        );
        assert_eq!(
            ConnectionState::Connected.on_failure(),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_connection_state_json() {
        let json = serde_json::to_string(&ConnectionState::Disconnected).unwrap();
        assert_eq!(json, "\"disconnected\"");
    }

    #[test]
    fn test_poll_cycle_every_third() {
        let mut cycle = PollCycle::new();
        let due: Vec<bool> = (0..7)
            .map(|_| PollCycle::is_due(cycle.advance(), 3))
            .collect();

        assert_eq!(due, vec![true, false, false, true, false, false, true]);
        assert_eq!(cycle.count(), 7);
    }

    #[test]
    fn test_poll_cycle_zero_never_due() {
        assert!(!PollCycle::is_due(0, 0));
        assert!(!PollCycle::is_due(30, 0));
        assert!(PollCycle::is_due(30, 1));
    }

    #[test]
    fn test_tracker_last_request_wins() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(EndpointFamily::Led);
        let second = tracker.begin(EndpointFamily::Led);

        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
    }

    #[test]
    fn test_tracker_families_are_independent() {
        let mut tracker = RequestTracker::new();
        let led = tracker.begin(EndpointFamily::Led);
        let lap = tracker.begin(EndpointFamily::Lap);

        assert!(tracker.is_current(&led));
        assert!(tracker.is_current(&lap));
        assert_eq!(lap.family(), EndpointFamily::Lap);
    }
}
