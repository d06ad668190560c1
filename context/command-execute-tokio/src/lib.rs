//! Tokio-based command execution implementation for awsign.
//!
//! This crate provides `TokioCommandExecute`, which implements the
//! `CommandExecute` trait from `awsign_core` by spawning processes with
//! Tokio. Profiles that configure a `credential_process` need it.
//!
//! ## Example
//!
//! ```no_run
//! use awsign_command_execute_tokio::TokioCommandExecute;
//! use awsign_core::{Context, OsEnv};
//!
//! #[tokio::main]
//! async fn main() {
//!     let ctx = Context::new()
//!         .with_command_execute(TokioCommandExecute)
//!         .with_env(OsEnv);
//!
//!     match ctx.command_execute("echo", &["hello", "world"]).await {
//!         Ok(output) if output.success() => {
//!             println!("Output: {}", String::from_utf8_lossy(&output.stdout))
//!         }
//!         Ok(output) => eprintln!("Exited with {}", output.status),
//!         Err(e) => eprintln!("Failed to execute command: {}", e),
//!     }
//! }
//! ```

use async_trait::async_trait;
use awsign_core::{CommandExecute, CommandOutput, Error, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Tokio-based implementation of the `CommandExecute` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandExecute;

#[async_trait]
impl CommandExecute for TokioCommandExecute {
    async fn command_execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                Error::unexpected(format!("failed to execute command {program}")).with_source(e)
            })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
