use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use psrp_remote::logging::init_logging;
use psrp_remote::module::{execute, ModuleResponse};
use psrp_remote::module_args::read_args;
use psrp_remote::transport::pwsh::DEFAULT_PWSH;
use psrp_remote::{FinalOutcome, PwshTransport};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "psrp_remote")]
#[command(about = "Ansible module: run a PowerShell script over PSRP, guarded by a test script")]
struct CliOptions {
    /// Module argument file written by Ansible (use '-' or omit for stdin)
    args_file: Option<String>,

    /// pwsh executable used as the remoting client
    #[arg(long = "pwsh", env = "PSRP_REMOTE_PWSH", default_value = DEFAULT_PWSH)]
    pwsh: PathBuf,

    /// Report what would change without running the main script
    #[arg(long = "check", action = ArgAction::SetTrue)]
    check: bool,
}

fn main() {
    init_logging();
    match run() {
        Ok(failed) => std::process::exit(if failed { 1 } else { 0 }),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let opts = CliOptions::parse();
    let started = Instant::now();

    let response = match read_args(opts.args_file.as_deref()) {
        Ok(mut args) => {
            args.check_mode |= opts.check;
            let transport = PwshTransport::new(&opts.pwsh, args.transport_options());
            execute(&transport, &args)
        }
        Err(err) => ModuleResponse::failure(FinalOutcome::default(), None, err.to_string()),
    };

    info!(
        elapsed = %humantime::format_duration(started.elapsed()),
        failed = response.failed,
        "psrp_remote finished"
    );

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response.payload).context("Failed to write module result")?;
    writeln!(stdout).context("Failed to write module result")?;
    Ok(response.failed)
}
