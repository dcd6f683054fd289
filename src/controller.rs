use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::ModuleError;
use crate::invoke::{
    invoke, InvocationRequest, InvocationResult, InvocationTarget, Streams, Transport,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FinalOutcome {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_output: Option<InvocationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streams: Option<Streams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// An error together with whatever the outcome held when it happened.
#[derive(Debug)]
pub struct Failure {
    pub outcome: Box<FinalOutcome>,
    pub error: ModuleError,
}

#[derive(Clone, Debug)]
pub struct RunOptions<'a> {
    pub test_script: Option<&'a str>,
    pub script: &'a str,
    pub expect_json: bool,
    /// Report what would change without running `script`.
    pub check_mode: bool,
}

impl<'a> RunOptions<'a> {
    pub fn new(script: &'a str) -> Self {
        Self {
            test_script: None,
            script,
            expect_json: false,
            check_mode: false,
        }
    }

    pub fn test_script(mut self, test_script: &'a str) -> Self {
        self.test_script = Some(test_script);
        self
    }

    pub fn expect_json(mut self, expect_json: bool) -> Self {
        self.expect_json = expect_json;
        self
    }

    pub fn check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }
}

/// Run the optional test script, then the main script if the test did not
/// report the desired state as already reached.
pub fn run<T: Transport>(
    transport: &T,
    target: &InvocationTarget,
    options: &RunOptions<'_>,
) -> Result<FinalOutcome, Failure> {
    let mut outcome = FinalOutcome::default();

    let mut satisfied = false;
    if let Some(test_script) = options.test_script.filter(|s| !s.trim().is_empty()) {
        let test = match invoke(transport, target, &InvocationRequest::new(test_script, false)) {
            Ok(test) => test,
            Err(err) => return Err(fail(outcome, err.into())),
        };
        let test_result = test.output.first().cloned();
        outcome.test_output = Some(test);
        satisfied = match test_result {
            Some(Value::Bool(flag)) => flag,
            other => return Err(fail(outcome, non_boolean(other.as_ref()))),
        };
        info!(satisfied, "test script finished");
    }

    if satisfied {
        info!("desired state already present, skipping script");
        return Ok(outcome);
    }

    if options.check_mode {
        info!("check mode, not running script");
        outcome.changed = true;
        return Ok(outcome);
    }

    let request = InvocationRequest::new(options.script, options.expect_json);
    match invoke(transport, target, &request) {
        Ok(applied) => {
            outcome.changed = true;
            outcome.output = Some(applied.output);
            outcome.streams = Some(applied.streams);
            Ok(outcome)
        }
        Err(err) => Err(fail(outcome, err.into())),
    }
}

fn fail(outcome: FinalOutcome, error: ModuleError) -> Failure {
    Failure {
        outcome: Box::new(outcome),
        error,
    }
}

fn non_boolean(found: Option<&Value>) -> ModuleError {
    let described = match found {
        None => "no output".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Number(n)) => format!("a number ({n})"),
        Some(Value::String(s)) => format!("a string ({s:?})"),
        Some(Value::Array(_)) => "an array".to_string(),
        Some(Value::Object(_)) => "an object".to_string(),
        Some(Value::Bool(_)) => "a boolean".to_string(),
    };
    ModuleError::TestResult(format!(
        "test_script must return a boolean ($true or $false) as its first output, got {described}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_error_names_what_was_found() {
        let err = non_boolean(Some(&json!("yes")));
        assert_eq!(
            err.to_string(),
            "test_script must return a boolean ($true or $false) as its first output, got a string (\"yes\")"
        );
        assert!(non_boolean(None).to_string().ends_with("got no output"));
    }

    #[test]
    fn empty_outcome_serialises_changed_only() {
        let outcome = FinalOutcome::default();
        assert_eq!(serde_json::to_value(outcome).unwrap(), json!({ "changed": false }));
    }
}
