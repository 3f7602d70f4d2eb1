//! LED, lap, traffic light and racer command handlers

use anyhow::Result;

use pitlane_core::{Endpoint, StateSyncClient, Transport};

use super::surface;
use crate::output::Output;

/// Call one endpoint and print what came back
///
/// Status endpoints print the family state; action endpoints print the
/// device message along with any state embedded in the response.
pub async fn run<T: Transport>(
    client: &StateSyncClient<T>,
    endpoint: Endpoint,
    output: &Output,
) -> Result<()> {
    let family = endpoint.family();

    if endpoint.is_command() {
        let response = client.send_command(&endpoint).await.map_err(surface)?;
        output.print_command(family, &response);
    } else {
        let snapshot = client.poll(&endpoint).await.map_err(surface)?;
        output.print_snapshot(family, &snapshot);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use pitlane_core::sync::testing::{led, refused, FakeDevice};
    use pitlane_core::EndpointFamily;
    use serde_json::json;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[tokio::test]
    async fn test_status_endpoint_is_a_plain_read() {
        let client = StateSyncClient::new(FakeDevice::new(vec![led(true)]));

        run(&client, Endpoint::LedStatus, &quiet()).await.unwrap();

        assert_eq!(client.transport().requests(), vec!["/api/led/status"]);
        // Reads don't populate the local mirror
        assert!(client.snapshot(EndpointFamily::Led).await.is_none());
    }

    #[tokio::test]
    async fn test_action_endpoint_goes_through_command() {
        let client = StateSyncClient::new(FakeDevice::new(vec![led(true)]));

        run(&client, Endpoint::LedOn, &quiet()).await.unwrap();

        assert_eq!(client.transport().requests(), vec!["/api/led/on"]);
        let stored = client.snapshot(EndpointFamily::Led).await.unwrap();
        assert_eq!(stored.led_is_on(), Some(true));
    }

    #[tokio::test]
    async fn test_refusal_fails_with_device_message() {
        let device = FakeDevice::new(vec![Ok(json!({
            "success": false,
            "message": "Carrera completada"
        }))]);
        let client = StateSyncClient::new(device);

        let err = run(&client, Endpoint::LapIncrement, &quiet()).await.unwrap_err();
        assert_eq!(err.to_string(), "Carrera completada");
    }

    #[tokio::test]
    async fn test_unreachable_device_fails() {
        let client = StateSyncClient::new(FakeDevice::new(vec![refused()]));

        let err = run(&client, Endpoint::RacerName, &quiet()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not reach the controller. Check the connection."
        );
    }
}
