//! Command handlers

pub mod config;
pub mod device;
pub mod status;
pub mod watch;

use anyhow::anyhow;

use pitlane_core::ClientError;

/// Convert a client error into what the user sees on exit
///
/// Device refusals are shown exactly as the device worded them.
pub fn surface(error: ClientError) -> anyhow::Error {
    if error.is_network() {
        let hint = error.user_message();
        return anyhow::Error::new(error).context(hint);
    }
    match error {
        ClientError::Application { message, .. } => anyhow!(message),
        other => other.into(),
    }
}
