//! In-memory devices for client tests
//!
//! Compiled for this crate's tests and, with the `test-util` feature, for
//! downstream crates that drive a client without a controller.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::transport::Transport;

pub fn refused() -> Result<Value, TransportError> {
    Err(TransportError::Unreachable("connection refused".to_string()))
}

pub fn led(is_on: bool) -> Result<Value, TransportError> {
    Ok(json!({ "success": true, "is_on": is_on }))
}

pub fn lap(current: u32) -> Result<Value, TransportError> {
    Ok(json!({
        "success": true,
        "race_status": {
            "current_laps": current,
            "max_laps": 10,
            "remaining_laps": 10 - current,
            "is_completed": false,
            "progress_percentage": f64::from(current) * 10.0,
            "is_race_started": true,
            "led_status": { "is_on": false }
        }
    }))
}

/// Plays back scripted responses; the last one repeats forever
pub struct FakeDevice {
    script: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<String>>,
    head_ok: AtomicBool,
}

impl FakeDevice {
    pub fn new(script: Vec<Result<Value, TransportError>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one response");
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            head_ok: AtomicBool::new(true),
        }
    }

    pub fn set_head_ok(&self, ok: bool) {
        self.head_ok.store(ok, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<Value, TransportError> {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

impl Transport for FakeDevice {
    fn base_url(&self) -> &str {
        "memory://fake-device"
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<Value, TransportError> {
        self.requests.lock().unwrap().push(endpoint.to_string());
        self.next_response()
    }

    async fn head(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        self.requests.lock().unwrap().push(format!("HEAD {}", endpoint));
        if self.head_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unreachable("probe timed out".to_string()))
        }
    }
}

/// Holds every response until the test releases it
///
/// Requests take gates in issue order, so the test decides arrival order.
pub struct GatedDevice {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<Value, TransportError>>>>,
    started: AtomicUsize,
}

impl GatedDevice {
    pub fn new(count: usize) -> (Self, Vec<oneshot::Sender<Result<Value, TransportError>>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..count).map(|_| oneshot::channel()).unzip();
        let device = Self {
            gates: Mutex::new(receivers),
            started: AtomicUsize::new(0),
        };
        (device, senders)
    }

    /// Requests that have reached the device so far
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl Transport for GatedDevice {
    fn base_url(&self) -> &str {
        "memory://gated-device"
    }

    async fn get(&self, _endpoint: &Endpoint) -> Result<Value, TransportError> {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .pop_front()
            .expect("more requests than gates");
        self.started.fetch_add(1, Ordering::SeqCst);
        gate.await
            .unwrap_or_else(|_| Err(TransportError::Unreachable("gate dropped".to_string())))
    }

    async fn head(&self, _endpoint: &Endpoint) -> Result<(), TransportError> {
        Ok(())
    }
}
