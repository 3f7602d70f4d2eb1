//! Background poll loop
//!
//! One timer at the fastest cadence drives every watched family. Slower
//! families and the connectivity probe run on every Nth tick, counted by
//! [`PollCycle`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::client::StateSyncClient;
use super::state::PollCycle;
use crate::config::Config;
use crate::endpoint::EndpointFamily;
use crate::transport::Transport;

/// Commands sent to the poll task
#[derive(Debug, Clone)]
pub enum PollerCommand {
    /// Refresh every watched family right away
    PollNow,
    /// Shutdown the poll task
    Shutdown,
}

/// What to poll and how often, in ticks
#[derive(Debug, Clone, PartialEq)]
pub struct PollPlan {
    /// Period of the poll loop
    pub tick: Duration,
    /// Watched families with their tick divisor
    pub watches: Vec<(EndpointFamily, u32)>,
    /// Tick divisor of the connectivity probe (0 disables it)
    pub connectivity_every: u32,
}

impl PollPlan {
    /// Derive divisors from configured intervals, rounding up
    pub fn from_config(config: &Config) -> Self {
        let tick = config.poll_interval();
        let every = |ms: u64| ticks_for(Duration::from_millis(ms), tick);

        let watches = [
            (EndpointFamily::Lap, config.watch.lap_ms),
            (EndpointFamily::TrafficLight, config.watch.traffic_light_ms),
            (EndpointFamily::Led, config.watch.led_ms),
            (EndpointFamily::Racer, config.watch.racer_ms),
        ]
        .into_iter()
        .filter(|(_, ms)| *ms > 0)
        .map(|(family, ms)| (family, every(ms)))
        .collect();

        Self {
            tick,
            watches,
            connectivity_every: every(config.connectivity_interval_ms),
        }
    }

    /// Families due on a given tick
    pub fn due(&self, cycle: u64) -> Vec<EndpointFamily> {
        self.watches
            .iter()
            .filter(|(_, every)| PollCycle::is_due(cycle, *every))
            .map(|(family, _)| *family)
            .collect()
    }

    pub fn probe_due(&self, cycle: u64) -> bool {
        PollCycle::is_due(cycle, self.connectivity_every)
    }

    pub fn families(&self) -> Vec<EndpointFamily> {
        self.watches.iter().map(|(family, _)| *family).collect()
    }
}

/// Ticks needed to cover `interval`; zero interval means never
fn ticks_for(interval: Duration, tick: Duration) -> u32 {
    if interval.is_zero() {
        return 0;
    }
    let tick_ms = tick.as_millis().max(1);
    let ticks = interval.as_millis().div_ceil(tick_ms);
    u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
}

/// Handle to control the poll task
pub struct PollerHandle {
    /// Send commands to the poll task
    pub command_tx: mpsc::Sender<PollerCommand>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask for an immediate refresh of every watched family
    pub async fn poll_now(&self) {
        let _ = self.command_tx.send(PollerCommand::PollNow).await;
    }

    /// Stop the task and wait for the current tick to finish
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(PollerCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Spawn the poll task
///
/// Results reach the consumer through the client's event channel.
pub fn spawn_poller<T>(client: Arc<StateSyncClient<T>>, plan: PollPlan) -> PollerHandle
where
    T: Transport + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(16);
    let task = tokio::spawn(poller_loop(client, plan, command_rx));

    PollerHandle { command_tx, task }
}

/// Main poll loop
async fn poller_loop<T>(
    client: Arc<StateSyncClient<T>>,
    plan: PollPlan,
    mut command_rx: mpsc::Receiver<PollerCommand>,
) where
    T: Transport + 'static,
{
    info!(
        "Polling {} families every {:?}",
        plan.watches.len(),
        plan.tick
    );

    let mut interval = tokio::time::interval(plan.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycle = PollCycle::new();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let current = cycle.advance();
                run_cycle(&client, &plan, current).await;
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(PollerCommand::PollNow) => {
                        client.refresh(&plan.families()).await;
                    }
                    Some(PollerCommand::Shutdown) | None => break,
                }
            }
        }
    }

    debug!("Poller stopped after {} ticks", cycle.count());
}

async fn run_cycle<T: Transport>(client: &StateSyncClient<T>, plan: &PollPlan, cycle: u64) {
    let families = plan.due(cycle);

    if plan.probe_due(cycle) {
        join(client.refresh(&families), client.check_connectivity()).await;
    } else if !families.is_empty() {
        client.refresh(&families).await;
    }
}
