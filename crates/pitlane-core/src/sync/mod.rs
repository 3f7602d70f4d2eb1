//! State synchronization with the controller
//!
//! Keeps a local mirror of device state fresh over a best-effort network.
//!
//! ## Model
//!
//! 1. Each endpoint family (LED, laps, traffic light, racer) has one snapshot
//! 2. Polls compare the new snapshot with the stored one and report changes
//! 3. Command responses replace the family snapshot directly
//! 4. Per-family request tokens make the last *issued* request win
//!
//! ## Usage
//!
//! ```ignore
//! let mut client = StateSyncClient::from_config(&config)?;
//! let mut events = client.take_events().unwrap();
//! let client = Arc::new(client);
//! let poller = spawn_poller(client.clone(), PollPlan::from_config(&config));
//! ```

mod client;
mod poller;
mod state;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use client::{CommandResponse, StateSyncClient, SyncEvent, TickOutcome};
pub use poller::{spawn_poller, PollPlan, PollerCommand, PollerHandle};
pub use state::{ConnectionState, PollCycle, RequestToken, RequestTracker};
