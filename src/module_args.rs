use std::fs;
use std::io::{self, Read};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ArgsError;
use crate::invoke::{InvocationTarget, DEFAULT_CONFIGURATION_NAME};
use crate::transport::{Authentication, TransportOptions};

const KNOWN: [&str; 9] = [
    "host",
    "script",
    "test_script",
    "configuration_name",
    "expect_json",
    "auth",
    "ssl",
    "port",
    "cert_validation",
];

const WRAPPER_KEY: &str = "ANSIBLE_MODULE_ARGS";
const CHECK_MODE_KEY: &str = "_ansible_check_mode";

/// Validated module arguments with defaults applied.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModuleArgs {
    pub host: String,
    pub script: String,
    pub test_script: Option<String>,
    pub configuration_name: String,
    pub expect_json: bool,
    pub auth: Authentication,
    pub ssl: bool,
    pub port: Option<u16>,
    pub cert_validation: bool,
    #[serde(skip)]
    pub check_mode: bool,
}

impl ModuleArgs {
    pub fn target(&self) -> InvocationTarget {
        InvocationTarget::new(self.host.clone()).with_configuration(self.configuration_name.clone())
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            authentication: self.auth,
            use_ssl: self.ssl,
            port: self.port,
            cert_validation: self.cert_validation,
        }
    }

    pub fn from_value(value: Value) -> Result<Self, ArgsError> {
        let Value::Object(mut map) = value else {
            return Err(ArgsError::NotAnObject);
        };
        if map.len() == 1 {
            if let Some(inner) = map.remove(WRAPPER_KEY) {
                return Self::from_value(inner);
            }
        }

        let unsupported: Vec<String> = map
            .keys()
            .filter(|key| !key.starts_with("_ansible_") && !KNOWN.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unsupported.is_empty() {
            return Err(ArgsError::Unsupported(unsupported));
        }

        let host = optional_str(&map, "host")?;
        let script = optional_str(&map, "script")?;
        let (host, script) = match (host, script) {
            (Some(host), Some(script)) => (host, script),
            (host, script) => {
                let mut missing = Vec::new();
                if host.is_none() {
                    missing.push("host".to_string());
                }
                if script.is_none() {
                    missing.push("script".to_string());
                }
                return Err(ArgsError::Missing(missing));
            }
        };

        let auth = match optional_str(&map, "auth")? {
            None => Authentication::default(),
            Some(raw) => raw.parse().map_err(|found| ArgsError::Choice {
                name: "auth".to_string(),
                allowed: Authentication::CHOICES,
                found,
            })?,
        };

        Ok(Self {
            host,
            script,
            test_script: optional_str(&map, "test_script")?,
            configuration_name: optional_str(&map, "configuration_name")?
                .unwrap_or_else(|| DEFAULT_CONFIGURATION_NAME.to_string()),
            expect_json: optional_bool(&map, "expect_json")?.unwrap_or(false),
            auth,
            ssl: optional_bool(&map, "ssl")?.unwrap_or(true),
            port: optional_port(&map, "port")?,
            cert_validation: optional_bool(&map, "cert_validation")?.unwrap_or(false),
            check_mode: optional_bool(&map, CHECK_MODE_KEY)?.unwrap_or(false),
        })
    }
}

/// Read the argument document from a file, or stdin for `-`/`None`.
pub fn read_args(source: Option<&str>) -> Result<ModuleArgs, ArgsError> {
    let text = match source {
        None | Some("-") => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|source| ArgsError::Read {
                    source_name: "stdin".to_string(),
                    source,
                })?;
            buffer
        }
        Some(path) => fs::read_to_string(path).map_err(|source| ArgsError::Read {
            source_name: path.to_string(),
            source,
        })?,
    };
    ModuleArgs::from_value(serde_json::from_str(&text)?)
}

fn type_error(name: &str, expected: &'static str, found: &Value) -> ArgsError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    };
    ArgsError::Type {
        name: name.to_string(),
        expected,
        found: found.to_string(),
    }
}

fn optional_str(map: &Map<String, Value>, name: &str) -> Result<Option<String>, ArgsError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(type_error(name, "str", other)),
    }
}

/// Booleans accept the same spellings Ansible does.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Some(true),
            Some(f) if f == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" | "on" | "1" | "true" | "t" => Some(true),
            "n" | "no" | "off" | "0" | "false" | "f" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn optional_bool(map: &Map<String, Value>, name: &str) -> Result<Option<bool>, ArgsError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_bool(value)
            .map(Some)
            .ok_or_else(|| type_error(name, "bool", value)),
    }
}

fn optional_port(map: &Map<String, Value>, name: &str) -> Result<Option<u16>, ArgsError> {
    let value = match map.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let port = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    port.and_then(|p| u16::try_from(p).ok())
        .filter(|p| *p != 0)
        .map(Some)
        .ok_or_else(|| type_error(name, "int", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn applies_defaults() {
        let args = ModuleArgs::from_value(json!({ "host": "h1", "script": "return 1+1" })).unwrap();
        assert_eq!(args.configuration_name, "Microsoft.PowerShell");
        assert!(!args.expect_json);
        assert!(args.ssl);
        assert!(!args.cert_validation);
        assert_eq!(args.auth, Authentication::Kerberos);
        assert_eq!(args.test_script, None);
        assert_eq!(args.port, None);
    }

    #[test]
    fn bool_spellings() {
        for (raw, expected) in [
            (json!("yes"), Some(true)),
            (json!("Off"), Some(false)),
            (json!(1), Some(true)),
            (json!(0), Some(false)),
            (json!("maybe"), None),
            (json!(2), None),
        ] {
            assert_eq!(parse_bool(&raw), expected, "{raw}");
        }
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = ModuleArgs::from_value(json!({ "host": "h", "script": "s", "port": 70000 }))
            .unwrap_err();
        assert!(matches!(err, ArgsError::Type { expected: "int", .. }));
    }
}
