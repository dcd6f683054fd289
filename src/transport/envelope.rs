use serde::Deserialize;
use serde_json::Value;

use crate::error::InvokeError;
use crate::invoke::{RawExecution, Streams};
use crate::remote::RemoteValue;

/// The single JSON document the pwsh wrapper prints on stdout.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    transport_error: Option<String>,
    #[serde(default)]
    had_errors: bool,
    #[serde(default)]
    output: Vec<Value>,
    #[serde(default)]
    streams: Streams,
}

pub fn decode_envelope(stdout: &str) -> Result<RawExecution, InvokeError> {
    // pwsh may print banners or host noise before the envelope; it is always
    // the last non-empty line.
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| InvokeError::transport("pwsh produced no output"))?;

    let envelope: Envelope = serde_json::from_str(line)
        .map_err(|err| InvokeError::transport(format!("unreadable response from pwsh: {err}")))?;

    if let Some(message) = envelope.transport_error {
        return Err(InvokeError::Transport(message));
    }

    let output = envelope
        .output
        .into_iter()
        .map(RemoteValue::from_wire)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawExecution {
        had_errors: envelope.had_errors,
        output,
        streams: envelope.streams,
    })
}
