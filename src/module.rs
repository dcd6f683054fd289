use serde_json::{json, Map, Value};
use tracing::error;

use crate::controller::{self, FinalOutcome, RunOptions};
use crate::invoke::Transport;
use crate::module_args::ModuleArgs;

/// What the module prints for Ansible.
#[derive(Debug)]
pub struct ModuleResponse {
    pub payload: Value,
    pub failed: bool,
}

impl ModuleResponse {
    pub fn success(outcome: FinalOutcome, args: Option<&ModuleArgs>) -> Self {
        Self {
            payload: build_payload(outcome, args, None),
            failed: false,
        }
    }

    pub fn failure(
        outcome: FinalOutcome,
        args: Option<&ModuleArgs>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            payload: build_payload(outcome, args, Some(msg.into())),
            failed: true,
        }
    }
}

/// Run the module end to end. Every error stops here and becomes a failure
/// payload that keeps any progress already made.
pub fn execute<T: Transport>(transport: &T, args: &ModuleArgs) -> ModuleResponse {
    let mut options = RunOptions::new(&args.script)
        .expect_json(args.expect_json)
        .check_mode(args.check_mode);
    if let Some(test_script) = args.test_script.as_deref() {
        options = options.test_script(test_script);
    }

    match controller::run(transport, &args.target(), &options) {
        Ok(outcome) => ModuleResponse::success(outcome, Some(args)),
        Err(failure) => {
            error!(error = %failure.error, host = %args.host, "psrp_remote failed");
            ModuleResponse::failure(*failure.outcome, Some(args), failure.error.to_string())
        }
    }
}

fn build_payload(
    mut outcome: FinalOutcome,
    args: Option<&ModuleArgs>,
    msg: Option<String>,
) -> Value {
    let failed = msg.is_some();
    outcome.msg = msg;
    let mut payload = match serde_json::to_value(&outcome) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    payload
        .entry("changed")
        .or_insert(Value::Bool(outcome.changed));
    if failed {
        payload.insert("failed".to_string(), Value::Bool(true));
    }
    if let Some(args) = args {
        payload.insert(
            "invocation".to_string(),
            json!({ "module_args": serde_json::to_value(args).unwrap_or(Value::Null) }),
        );
    }
    Value::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_comes_from_the_outcome() {
        let response = ModuleResponse::failure(FinalOutcome::default(), None, "refused");
        assert_eq!(
            response.payload,
            json!({ "changed": false, "msg": "refused", "failed": true })
        );
    }

    #[test]
    fn success_has_no_message_or_failed_flag() {
        let outcome = FinalOutcome {
            changed: true,
            ..FinalOutcome::default()
        };
        let response = ModuleResponse::success(outcome, None);
        assert_eq!(response.payload, json!({ "changed": true }));
    }
}
