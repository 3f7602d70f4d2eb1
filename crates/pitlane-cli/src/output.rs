//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::Local;
use pitlane_core::sync::CommandResponse;
use pitlane_core::{ConnectionState, EndpointFamily, StatusSnapshot, SyncEvent};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print one family's state
    pub fn print_snapshot(&self, family: EndpointFamily, snapshot: &StatusSnapshot) {
        match self.format {
            OutputFormat::Human => {
                for line in describe_snapshot(family, snapshot) {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => {
                println!("{}", snapshot_json(family, snapshot));
            }
            OutputFormat::Quiet => {
                println!("{}", summarize_snapshot(family, snapshot));
            }
        }
    }

    /// Print the answer to a command
    pub fn print_command(&self, family: EndpointFamily, response: &CommandResponse) {
        match self.format {
            OutputFormat::Human => {
                if let Some(ref message) = response.message {
                    println!("✓ {}", message);
                }
                if !response.snapshot.is_empty() {
                    for line in describe_snapshot(family, &response.snapshot) {
                        println!("{}", line);
                    }
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "success",
                        "message": response.message,
                        "family": family,
                        "state": response.snapshot.as_json(),
                    })
                );
            }
            OutputFormat::Quiet => {
                if !response.snapshot.is_empty() {
                    println!("{}", summarize_snapshot(family, &response.snapshot));
                }
            }
        }
    }

    /// Print a connection state
    pub fn print_connection(&self, base_url: &str, state: ConnectionState) {
        match self.format {
            OutputFormat::Human => println!("{}: {}", base_url, connection_label(state)),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"url": base_url, "connection": state})
                );
            }
            OutputFormat::Quiet => println!("{}", state),
        }
    }

    /// Print an event from the poll loop
    pub fn print_event(&self, event: &SyncEvent) {
        let stamp = Local::now().format("%H:%M:%S");
        match (self.format, event) {
            (OutputFormat::Json, SyncEvent::StatusChanged(state)) => {
                println!("{}", serde_json::json!({"event": "connection", "connection": state}));
            }
            (OutputFormat::Json, SyncEvent::SnapshotChanged { family, snapshot }) => {
                println!("{}", snapshot_json(*family, snapshot));
            }
            (OutputFormat::Json, SyncEvent::Error(message)) => {
                println!("{}", serde_json::json!({"event": "error", "message": message}));
            }
            (OutputFormat::Human, SyncEvent::StatusChanged(state)) => {
                println!("[{}] ── {} ──", stamp, connection_label(*state));
            }
            (OutputFormat::Human, SyncEvent::SnapshotChanged { family, snapshot }) => {
                let lines = describe_snapshot(*family, snapshot);
                println!("[{}] {}", stamp, lines.join(" | "));
            }
            (OutputFormat::Human, SyncEvent::Error(message)) => {
                eprintln!("[{}] ⚠ {}", stamp, message);
            }
            (OutputFormat::Quiet, SyncEvent::SnapshotChanged { family, snapshot }) => {
                println!("{} {}", family, summarize_snapshot(*family, snapshot));
            }
            (OutputFormat::Quiet, _) => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "Connecting...",
        ConnectionState::Connected => "Connected",
        ConnectionState::Disconnected => "Disconnected",
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn lamp(on: bool) -> char {
    if on {
        '●'
    } else {
        '○'
    }
}

/// JSON form of a snapshot, shared by one-shot and watch output
fn snapshot_json(family: EndpointFamily, snapshot: &StatusSnapshot) -> serde_json::Value {
    serde_json::json!({
        "family": family,
        "state": snapshot.as_json(),
        "fetched_at": snapshot.fetched_at().to_rfc3339(),
    })
}

/// Human-readable lines for a family's state
pub fn describe_snapshot(family: EndpointFamily, snapshot: &StatusSnapshot) -> Vec<String> {
    let mut lines = Vec::new();

    match family {
        EndpointFamily::Led => {
            if let Some(on) = snapshot.led_is_on() {
                lines.push(format!("LED: {}", on_off(on)));
            }
        }
        EndpointFamily::Lap => {
            if let Some(race) = snapshot.race_status() {
                lines.push(format!(
                    "Laps: {}/{} ({} remaining)",
                    race.current_laps, race.max_laps, race.remaining_laps
                ));
                lines.push(format!("Progress: {:.1}%", race.progress_percentage));
                let phase = if race.is_completed {
                    "completed"
                } else if race.is_race_started {
                    "running"
                } else {
                    "not started"
                };
                lines.push(format!("Race: {}", phase));
                if let Some(led) = race.led_status {
                    lines.push(format!("LED: {}", on_off(led.is_on)));
                }
            }
        }
        EndpointFamily::TrafficLight => {
            if let Some(light) = snapshot.traffic_light() {
                lines.push(format!(
                    "Light: {}  R{} Y{} G{}",
                    light.phase(),
                    lamp(light.red_on),
                    lamp(light.yellow_on),
                    lamp(light.green_on)
                ));
                if light.blinking_active {
                    lines.push("Blinking: yes".to_string());
                }
            }
            if let Some(race) = snapshot.race_status() {
                lines.push(format!("Laps: {}/{}", race.current_laps, race.max_laps));
            }
        }
        EndpointFamily::Racer => {
            if let Some(name) = snapshot.racer_name() {
                lines.push(format!("Racer: {}", name));
            }
        }
    }

    // Payloads this client doesn't know how to read are shown raw
    if lines.is_empty() {
        lines.push(format!(
            "{}: {}",
            family,
            serde_json::Value::Object(snapshot.as_json().clone())
        ));
    }
    lines
}

/// Single-token summary for quiet mode
pub fn summarize_snapshot(family: EndpointFamily, snapshot: &StatusSnapshot) -> String {
    let summary = match family {
        EndpointFamily::Led => snapshot.led_is_on().map(|on| on_off(on).to_string()),
        EndpointFamily::Lap => snapshot
            .race_status()
            .map(|race| format!("{}/{}", race.current_laps, race.max_laps)),
        EndpointFamily::TrafficLight => snapshot
            .traffic_light()
            .map(|light| light.phase().to_string()),
        EndpointFamily::Racer => snapshot.racer_name(),
    };
    summary.unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> StatusSnapshot {
        StatusSnapshot::from_value(value)
    }

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_describe_led() {
        let lines = describe_snapshot(EndpointFamily::Led, &snapshot(json!({"is_on": true})));
        assert_eq!(lines, vec!["LED: on"]);
    }

    #[test]
    fn test_describe_lap() {
        let lap = snapshot(json!({
            "race_status": {
                "current_laps": 3,
                "max_laps": 3,
                "remaining_laps": 0,
                "is_completed": true,
                "progress_percentage": 100.0,
                "is_race_started": true,
                "led_status": {"is_on": true}
            }
        }));

        let lines = describe_snapshot(EndpointFamily::Lap, &lap);
        assert_eq!(
            lines,
            vec![
                "Laps: 3/3 (0 remaining)",
                "Progress: 100.0%",
                "Race: completed",
                "LED: on",
            ]
        );
        assert_eq!(summarize_snapshot(EndpointFamily::Lap, &lap), "3/3");
    }

    #[test]
    fn test_describe_traffic_light() {
        let light = snapshot(json!({
            "traffic_light_status": {
                "state": "red",
                "red_on": true,
                "yellow_on": false,
                "green_on": false,
                "blinking_active": false
            }
        }));

        let lines = describe_snapshot(EndpointFamily::TrafficLight, &light);
        assert_eq!(lines, vec!["Light: red  R● Y○ G○"]);
        assert_eq!(summarize_snapshot(EndpointFamily::TrafficLight, &light), "red");
    }

    #[test]
    fn test_unknown_payload_shown_raw() {
        let odd = snapshot(json!({"temperature": 41}));
        let lines = describe_snapshot(EndpointFamily::Led, &odd);
        assert_eq!(lines, vec![r#"led: {"temperature":41}"#]);
        assert_eq!(summarize_snapshot(EndpointFamily::Led, &odd), "-");
    }

    #[test]
    fn test_racer_summary() {
        let racer = snapshot(json!({"racer_name": "Casalis"}));
        assert_eq!(summarize_snapshot(EndpointFamily::Racer, &racer), "Casalis");
        assert_eq!(
            describe_snapshot(EndpointFamily::Racer, &racer),
            vec!["Racer: Casalis"]
        );
    }
}
