pub mod envelope;
pub mod pwsh;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use pwsh::{PwshPool, PwshTransport};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Authentication {
    #[default]
    Kerberos,
    Negotiate,
}

impl Authentication {
    pub const CHOICES: &'static str = "kerberos, negotiate";

    /// Value passed to `New-PSSession -Authentication`.
    pub fn as_pwsh(&self) -> &'static str {
        match self {
            Authentication::Kerberos => "Kerberos",
            Authentication::Negotiate => "Negotiate",
        }
    }
}

impl FromStr for Authentication {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kerberos" => Ok(Authentication::Kerberos),
            "negotiate" => Ok(Authentication::Negotiate),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Authentication::Kerberos => "kerberos",
            Authentication::Negotiate => "negotiate",
        })
    }
}

/// How the remoting client connects.
///
/// `cert_validation` defaults to `false`: the server certificate's CA and
/// name are not checked. This suits hosts with self-signed or unmanaged
/// certificates but removes protection against an impersonated endpoint;
/// set it to `true` wherever the WinRM listener has a trusted certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportOptions {
    pub authentication: Authentication,
    pub use_ssl: bool,
    pub port: Option<u16>,
    pub cert_validation: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            authentication: Authentication::Kerberos,
            use_ssl: true,
            port: None,
            cert_validation: false,
        }
    }
}
