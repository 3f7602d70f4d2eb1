//! Status and probe command handlers

use anyhow::{bail, Result};

use pitlane_core::{ConnectionState, EndpointFamily, StateSyncClient, TickOutcome, Transport};

use crate::output::{describe_snapshot, Output, OutputFormat};

/// Show every family's state in one go
pub async fn show<T: Transport>(client: &StateSyncClient<T>, output: &Output) -> Result<()> {
    let outcomes = client.refresh(&EndpointFamily::ALL).await;
    let base_url = client.transport().base_url();

    let mut families = serde_json::Map::new();
    let mut failures = Vec::new();
    let mut lines = Vec::new();

    for (family, outcome) in outcomes {
        if let TickOutcome::Failed(e) = outcome {
            failures.push((family, e.user_message()));
            continue;
        }
        if let Some(snapshot) = client.snapshot(family).await {
            families.insert(
                family.to_string(),
                serde_json::Value::Object(snapshot.as_json().clone()),
            );
            lines.extend(describe_snapshot(family, &snapshot));
        }
    }

    let connection = client.connection_state();

    match output.format {
        OutputFormat::Json => {
            let errors: serde_json::Map<String, serde_json::Value> = failures
                .iter()
                .map(|(family, msg)| (family.to_string(), msg.clone().into()))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "url": base_url,
                    "connection": connection,
                    "families": families,
                    "errors": errors,
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", connection);
        }
        OutputFormat::Human => {
            println!("Controller Status");
            println!("=================");
            println!();
            println!("  URL:        {}", base_url);
            println!("  Connection: {}", connection);
            println!();
            for line in &lines {
                println!("  {}", line);
            }
            for (family, msg) in &failures {
                println!("  {}: {}", family, msg);
            }
        }
    }

    if failures.len() == EndpointFamily::ALL.len() {
        bail!("No status could be read from {}", base_url);
    }
    Ok(())
}

/// Headers-only liveness check; fails when the device is unreachable
pub async fn probe<T: Transport>(client: &StateSyncClient<T>, output: &Output) -> Result<()> {
    let base_url = client.transport().base_url();
    let state = client.check_connectivity().await;

    output.print_connection(base_url, state);

    if state == ConnectionState::Disconnected {
        bail!("Controller at {} is not reachable", base_url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitlane_core::sync::testing::{led, refused, FakeDevice};

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[tokio::test]
    async fn test_status_fails_when_nothing_is_readable() {
        let client = StateSyncClient::new(FakeDevice::new(vec![refused()]));

        let err = show(&client, &quiet()).await.unwrap_err();

        assert!(err.to_string().starts_with("No status could be read"));
        assert_eq!(client.transport().requests().len(), EndpointFamily::ALL.len());
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_status_succeeds_with_partial_reads() {
        // First family read answers, the rest are refused
        let client = StateSyncClient::new(FakeDevice::new(vec![led(true), refused()]));

        show(&client, &quiet()).await.unwrap();
    }

    #[tokio::test]
    async fn test_probe_exit_follows_connection() {
        let client = StateSyncClient::new(FakeDevice::new(vec![led(true)]));
        probe(&client, &quiet()).await.unwrap();

        client.transport().set_head_ok(false);
        let err = probe(&client, &quiet()).await.unwrap_err();
        assert!(err.to_string().contains("is not reachable"));
        assert_eq!(client.transport().requests(), vec!["HEAD /api/led/status"; 2]);
    }
}
