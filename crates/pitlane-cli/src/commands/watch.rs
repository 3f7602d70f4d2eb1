//! Watch command handler

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use pitlane_core::sync::{spawn_poller, PollPlan};
use pitlane_core::{Config, StateSyncClient, Transport};

use crate::output::Output;

/// Poll until Ctrl-C, printing every change
pub async fn run<T: Transport + 'static>(
    mut client: StateSyncClient<T>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let plan = PollPlan::from_config(config);
    if plan.watches.is_empty() {
        bail!("Nothing to watch. Set a non-zero interval under [watch] in the config.");
    }

    let mut events = client
        .take_events()
        .context("Event channel already taken")?;
    let client = Arc::new(client);

    let families: Vec<String> = plan.families().iter().map(|f| f.to_string()).collect();
    output.message(&format!(
        "Watching {} at {} (Ctrl-C to stop)",
        families.join(", "),
        client.transport().base_url()
    ));

    let poller = spawn_poller(client.clone(), plan);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => output.print_event(&event),
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping poller");
                break;
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}
