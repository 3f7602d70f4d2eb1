//! State-sync client implementation
//!
//! Mirrors device state locally. Status reads are compared against the last
//! snapshot of their family and only real changes are reported; command
//! responses replace the family snapshot directly.

use std::collections::HashMap;

use anyhow::Result;
use futures_util::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use super::state::{ConnectionState, RequestToken, RequestTracker};
use crate::config::Config;
use crate::endpoint::{Endpoint, EndpointFamily};
use crate::error::{ClientError, ClientResult};
use crate::models::{Envelope, StatusSnapshot};
use crate::transport::{HttpTransport, Transport};

/// Events queued before the consumer falls behind
const EVENT_CAPACITY: usize = 64;

/// State fields and device message of a successful response
type StateFields = (Map<String, Value>, Option<String>);

/// Events emitted by the sync client
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Connection state changed
    StatusChanged(ConnectionState),
    /// A family's state changed; the consumer should reconcile its view
    SnapshotChanged {
        family: EndpointFamily,
        snapshot: StatusSnapshot,
    },
    /// A request failed; carries the user-facing message
    Error(String),
}

/// Result of one polling tick for one endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Snapshot differed and was stored
    Changed,
    /// Snapshot was structurally identical to the stored one
    Unchanged,
    /// A newer request for the family was issued meanwhile; result dropped
    Superseded,
    Failed(ClientError),
}

/// Answer to a command
#[derive(Debug, Clone)]
pub struct CommandResponse {
    /// State fields embedded in the response
    pub snapshot: StatusSnapshot,
    /// Device message, if any
    pub message: Option<String>,
    /// Whether the snapshot became the local state of its family
    pub applied: bool,
}

#[derive(Debug, Default)]
struct LocalState {
    snapshots: HashMap<EndpointFamily, StatusSnapshot>,
    tracker: RequestTracker,
}

/// Keeps a local mirror of device state fresh
pub struct StateSyncClient<T: Transport> {
    transport: T,
    local: Mutex<LocalState>,
    /// Current connection state
    status: watch::Sender<ConnectionState>,
    /// Status receiver for external monitoring
    status_rx: watch::Receiver<ConnectionState>,
    /// Event channel
    event_tx: mpsc::Sender<SyncEvent>,
    /// Event receiver
    event_rx: Option<mpsc::Receiver<SyncEvent>>,
}

impl StateSyncClient<HttpTransport> {
    /// Create a client talking HTTP to the configured device
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(HttpTransport::from_config(config)?))
    }
}

impl<T: Transport> StateSyncClient<T> {
    pub fn new(transport: T) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionState::Connecting);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);

        Self {
            transport,
            local: Mutex::new(LocalState::default()),
            status: status_tx,
            status_rx,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Get the current connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.status_rx.borrow()
    }

    /// Subscribe to connection state changes
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status_rx.clone()
    }

    /// Take the event receiver (can only be called once)
    ///
    /// Events are dropped while the queue is full, including when nobody
    /// took the receiver.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx.take()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Last stored snapshot for a family
    pub async fn snapshot(&self, family: EndpointFamily) -> Option<StatusSnapshot> {
        self.local.lock().await.snapshots.get(&family).cloned()
    }

    /// Read an endpoint, requiring `success: true`
    pub async fn poll(&self, endpoint: &Endpoint) -> ClientResult<StatusSnapshot> {
        let result = self.request(endpoint).await;
        self.track_connection(&result);
        let (state, _message) = result?;
        Ok(StatusSnapshot::new(state))
    }

    /// Poll an endpoint and store the result if it changed
    ///
    /// Failures are logged and emitted as events, never returned as `Err`.
    /// A result whose request was superseded is dropped without touching
    /// the connection state.
    pub async fn on_tick(&self, endpoint: &Endpoint) -> TickOutcome {
        let token = self.begin(endpoint.family()).await;

        let result = self.request(endpoint).await;
        if !self.is_current(&token).await {
            debug!("Dropping superseded {} poll", token.family());
            return TickOutcome::Superseded;
        }
        self.track_connection(&result);

        match result {
            Ok((state, _message)) => self.reconcile(token, StatusSnapshot::new(state)).await,
            Err(e) => {
                self.emit(SyncEvent::Error(e.user_message()));
                TickOutcome::Failed(e)
            }
        }
    }

    /// Tick the status endpoint of every given family concurrently
    pub async fn refresh(&self, families: &[EndpointFamily]) -> Vec<(EndpointFamily, TickOutcome)> {
        let endpoints: Vec<Endpoint> = families.iter().map(|f| f.status_endpoint()).collect();
        let outcomes = join_all(endpoints.iter().map(|endpoint| self.on_tick(endpoint))).await;
        families.iter().copied().zip(outcomes).collect()
    }

    /// Call an action endpoint
    ///
    /// The state embedded in a successful response replaces the family
    /// snapshot as-is. A refusal leaves local state untouched. When a newer
    /// request for the family was issued meanwhile, the outcome is still
    /// returned but neither applied nor reflected in the connection state.
    pub async fn send_command(&self, endpoint: &Endpoint) -> ClientResult<CommandResponse> {
        let token = self.begin(endpoint.family()).await;

        let result = self.request(endpoint).await;
        let current = self.is_current(&token).await;
        if current {
            self.track_connection(&result);
        }

        let (state, message) = match result {
            Ok(response) => response,
            Err(e) => {
                if current {
                    self.emit(SyncEvent::Error(e.user_message()));
                }
                return Err(e);
            }
        };
        let snapshot = StatusSnapshot::new(state);

        let applied = if snapshot.is_empty() {
            false
        } else {
            self.reconcile(token, snapshot.clone()).await != TickOutcome::Superseded
        };

        Ok(CommandResponse {
            snapshot,
            message,
            applied,
        })
    }

    /// Headers-only liveness probe; only touches the connection state
    pub async fn check_connectivity(&self) -> ConnectionState {
        match self.transport.head(&Endpoint::LedStatus).await {
            Ok(()) => self.set_connection(ConnectionState::Connected),
            Err(e) => {
                debug!("Connectivity probe failed: {}", e);
                self.set_connection(ConnectionState::Disconnected);
            }
        }
        self.connection_state()
    }

    async fn begin(&self, family: EndpointFamily) -> RequestToken {
        self.local.lock().await.tracker.begin(family)
    }

    async fn is_current(&self, token: &RequestToken) -> bool {
        self.local.lock().await.tracker.is_current(token)
    }

    /// Send a request and unwrap the envelope
    async fn request(&self, endpoint: &Endpoint) -> ClientResult<StateFields> {
        match self.transport.get(endpoint).await {
            Ok(body) => Envelope::parse(endpoint, body).and_then(|env| env.into_state(endpoint)),
            Err(e) => Err(e.into_client_error(&endpoint.to_string())),
        }
    }

    fn track_connection(&self, result: &ClientResult<StateFields>) {
        match result {
            Ok(_) => self.set_connection(ConnectionState::Connected),
            Err(e) => {
                warn!("{}", e);
                if e.affects_connection() {
                    self.set_connection(ConnectionState::Disconnected);
                }
            }
        }
    }

    /// Store a snapshot if its request is still the newest and it changed
    async fn reconcile(&self, token: RequestToken, snapshot: StatusSnapshot) -> TickOutcome {
        let family = token.family();
        let mut local = self.local.lock().await;

        if !local.tracker.is_current(&token) {
            debug!("Dropping superseded {} response", family);
            return TickOutcome::Superseded;
        }

        if local.snapshots.get(&family) == Some(&snapshot) {
            return TickOutcome::Unchanged;
        }

        local.snapshots.insert(family, snapshot.clone());
        drop(local);

        debug!("{} snapshot changed", family);
        self.emit(SyncEvent::SnapshotChanged { family, snapshot });
        TickOutcome::Changed
    }

    fn set_connection(&self, next: ConnectionState) {
        let changed = self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if changed {
            info!("Device {}", next);
            self.emit(SyncEvent::StatusChanged(next));
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            debug!("Dropping sync event: {}", e);
        }
    }
}
