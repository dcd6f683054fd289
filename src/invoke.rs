use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::InvokeError;
use crate::remote::{normalize_all, RemoteValue};

pub const DEFAULT_CONFIGURATION_NAME: &str = "Microsoft.PowerShell";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationTarget {
    pub host: String,
    pub configuration_name: String,
}

impl InvocationTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            configuration_name: DEFAULT_CONFIGURATION_NAME.to_string(),
        }
    }

    pub fn with_configuration(mut self, configuration_name: impl Into<String>) -> Self {
        self.configuration_name = configuration_name.into();
        self
    }
}

impl fmt::Display for InvocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.host, self.configuration_name)
    }
}

#[derive(Clone, Debug)]
pub struct InvocationRequest {
    pub script: String,
    pub expect_json: bool,
}

impl InvocationRequest {
    pub fn new(script: impl Into<String>, expect_json: bool) -> Self {
        Self {
            script: script.into(),
            expect_json,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamCategory {
    Debug,
    Error,
    Information,
    Verbose,
    Warning,
}

/// Messages collected from the five PowerShell streams. Every category is
/// always serialised, empty or not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streams {
    #[serde(default)]
    pub debug: Vec<String>,
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub information: Vec<String>,
    #[serde(default)]
    pub verbose: Vec<String>,
    #[serde(default)]
    pub warning: Vec<String>,
}

impl Streams {
    pub fn get(&self, category: StreamCategory) -> &[String] {
        match category {
            StreamCategory::Debug => &self.debug,
            StreamCategory::Error => &self.error,
            StreamCategory::Information => &self.information,
            StreamCategory::Verbose => &self.verbose,
            StreamCategory::Warning => &self.warning,
        }
    }

    pub fn get_mut(&mut self, category: StreamCategory) -> &mut Vec<String> {
        match category {
            StreamCategory::Debug => &mut self.debug,
            StreamCategory::Error => &mut self.error,
            StreamCategory::Information => &mut self.information,
            StreamCategory::Verbose => &mut self.verbose,
            StreamCategory::Warning => &mut self.warning,
        }
    }

    pub fn push(&mut self, category: StreamCategory, message: impl Into<String>) {
        self.get_mut(category).push(message.into());
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InvocationResult {
    pub output: Vec<Value>,
    pub streams: Streams,
}

/// What a command pool reports after running one script.
#[derive(Clone, Debug, Default)]
pub struct RawExecution {
    pub had_errors: bool,
    pub output: Vec<RemoteValue>,
    pub streams: Streams,
}

pub trait Transport {
    type Pool: CommandPool;

    /// Open a command pool bound to `target.configuration_name` on `target.host`.
    fn open_pool(&self, target: &InvocationTarget) -> Result<Self::Pool, InvokeError>;
}

pub trait CommandPool {
    fn run(&mut self, script: &str) -> Result<RawExecution, InvokeError>;

    /// Release the pool and its remote session. Called exactly once.
    fn close(&mut self) -> Result<(), InvokeError>;
}

/// Holds an open pool and guarantees `close` runs once, whichever way the
/// caller leaves.
pub struct PoolScope<P: CommandPool> {
    pool: P,
    released: bool,
}

impl<P: CommandPool> PoolScope<P> {
    pub fn new(pool: P) -> Self {
        Self {
            pool,
            released: false,
        }
    }

    pub fn release(mut self) -> Result<(), InvokeError> {
        self.released = true;
        self.pool.close()
    }
}

impl<P: CommandPool> Deref for PoolScope<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.pool
    }
}

impl<P: CommandPool> DerefMut for PoolScope<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.pool
    }
}

impl<P: CommandPool> Drop for PoolScope<P> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.pool.close() {
            warn!(error = %err, "failed to release command pool");
        }
    }
}

/// Run one script against `target` and collect its output and streams.
pub fn invoke<T: Transport>(
    transport: &T,
    target: &InvocationTarget,
    request: &InvocationRequest,
) -> Result<InvocationResult, InvokeError> {
    let mut pool = PoolScope::new(transport.open_pool(target)?);
    debug!(remote = %target, "command pool opened");

    info!(remote = %target, expect_json = request.expect_json, "submitting script");
    let raw = pool.run(&request.script)?;
    if raw.had_errors {
        // `pool` is released by its guard on the way out.
        return Err(InvokeError::Execution(raw.streams.error));
    }

    let output = if request.expect_json {
        parse_json_records(&raw.output)?
    } else {
        normalize_all(&raw.output)
    };

    pool.release()?;
    debug!(remote = %target, "command pool released");

    Ok(InvocationResult {
        output,
        streams: raw.streams,
    })
}

fn parse_json_records(records: &[RemoteValue]) -> Result<Vec<Value>, InvokeError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| match record {
            RemoteValue::Primitive(Value::String(text)) => serde_json::from_str(text).map_err(
                |err| InvokeError::Deserialization {
                    index,
                    reason: err.to_string(),
                },
            ),
            _ => Err(InvokeError::Deserialization {
                index,
                reason: "record is not a string".to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn streams_serialise_every_category() {
        let mut streams = Streams::default();
        streams.push(StreamCategory::Warning, "careful");
        assert_eq!(
            serde_json::to_value(&streams).unwrap(),
            json!({
                "debug": [],
                "error": [],
                "information": [],
                "verbose": [],
                "warning": ["careful"]
            })
        );
    }

    #[test]
    fn json_records_must_be_text() {
        let records: Vec<RemoteValue> = vec![json!("{\"a\":1}").into(), json!(5).into()];
        let err = parse_json_records(&records).unwrap_err();
        assert!(matches!(err, InvokeError::Deserialization { index: 1, .. }));
    }
}
