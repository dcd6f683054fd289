use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::envelope::decode_envelope;
use super::TransportOptions;
use crate::error::InvokeError;
use crate::invoke::{CommandPool, InvocationTarget, RawExecution, Transport};

const WRAPPER: &str = include_str!("wrapper.ps1");

pub const DEFAULT_PWSH: &str = "pwsh";

/// Drives the PowerShell 7 remoting client. Each pool is one `pwsh` process
/// holding one PSSession for the lifetime of the pool.
#[derive(Clone, Debug)]
pub struct PwshTransport {
    executable: PathBuf,
    options: TransportOptions,
}

impl PwshTransport {
    pub fn new(executable: impl Into<PathBuf>, options: TransportOptions) -> Self {
        Self {
            executable: executable.into(),
            options,
        }
    }

    fn command(&self, target: &InvocationTarget, script_path: &Path) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(["-NoLogo", "-NoProfile", "-NonInteractive", "-File"])
            .arg(script_path)
            .env("PSRP_REMOTE_HOST", &target.host)
            .env("PSRP_REMOTE_CONFIGURATION", &target.configuration_name)
            .env("PSRP_REMOTE_AUTH", self.options.authentication.as_pwsh())
            .env("PSRP_REMOTE_SSL", flag(self.options.use_ssl))
            .env(
                "PSRP_REMOTE_CERT_VALIDATION",
                flag(self.options.cert_validation),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        match self.options.port {
            Some(port) => command.env("PSRP_REMOTE_PORT", port.to_string()),
            None => command.env_remove("PSRP_REMOTE_PORT"),
        };
        command
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

impl Transport for PwshTransport {
    type Pool = PwshPool;

    fn open_pool(&self, target: &InvocationTarget) -> Result<PwshPool, InvokeError> {
        if !self.options.cert_validation && self.options.use_ssl {
            warn!(host = %target.host, "server certificate validation is disabled");
        }

        let mut script = tempfile::Builder::new()
            .prefix("psrp_remote-")
            .suffix(".ps1")
            .tempfile()
            .map_err(|err| InvokeError::transport(format!("unable to stage pwsh wrapper: {err}")))?;
        script
            .write_all(WRAPPER.as_bytes())
            .and_then(|_| script.flush())
            .map_err(|err| InvokeError::transport(format!("unable to stage pwsh wrapper: {err}")))?;

        let child = self.command(target, script.path()).spawn().map_err(|err| {
            InvokeError::transport(format!(
                "unable to start {}: {err}",
                self.executable.display()
            ))
        })?;
        debug!(pid = child.id(), host = %target.host, "pwsh session process started");

        Ok(PwshPool {
            child: Some(child),
            script,
        })
    }
}

pub struct PwshPool {
    child: Option<Child>,
    // Removed from disk when the pool is dropped.
    script: NamedTempFile,
}

impl PwshPool {
    /// Where the wrapper script was staged for this session.
    pub fn script_path(&self) -> &Path {
        self.script.path()
    }

    fn finish(mut child: Child, body: &str) -> Result<(i32, String, String), InvokeError> {
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(body.as_bytes()) {
                // pwsh exits early when it cannot connect; its envelope says why.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(InvokeError::transport(format!(
                        "unable to send script to pwsh: {err}"
                    )));
                }
                Ok(()) => {}
            }
        }
        let output = child
            .wait_with_output()
            .map_err(|err| InvokeError::transport(format!("lost pwsh session process: {err}")))?;
        Ok((
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}

impl CommandPool for PwshPool {
    fn run(&mut self, script: &str) -> Result<RawExecution, InvokeError> {
        let child = self
            .child
            .take()
            .ok_or_else(|| InvokeError::transport("pwsh session already used"))?;
        let (code, stdout, stderr) = Self::finish(child, script)?;
        debug!(code, "pwsh session process exited");

        decode_envelope(&stdout).map_err(|err| {
            let stderr = stderr.trim();
            if code != 0 && !stderr.is_empty() {
                InvokeError::transport(format!("pwsh exited with status {code}: {stderr}"))
            } else {
                err
            }
        })
    }

    fn close(&mut self) -> Result<(), InvokeError> {
        // An unused session is closed by feeding the wrapper an empty script,
        // which lets it remove the PSSession before exiting.
        match self.child.take() {
            Some(child) => Self::finish(child, "").map(|_| ()),
            None => Ok(()),
        }
    }
}

impl Drop for PwshPool {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
