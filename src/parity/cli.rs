//! CLI-based PAR2 handler using external par2 binary

use super::parser::{ExitStatus, parse_par2_repair_output, parse_par2_verify_output};
use super::traits::{ParityCapabilities, ParityHandler, RepairResult, VerifyResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// CLI-based PAR2 handler using external par2 binary
///
/// This handler executes the external `par2` binary to perform verification
/// and repair operations. It provides full PAR2 functionality including both
/// verification and repair capabilities.
///
/// # Examples
///
/// ```no_run
/// use usenet_dl::parity::{CliParityHandler, ParityHandler};
/// use std::path::{Path, PathBuf};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let handler = CliParityHandler::new(PathBuf::from("/usr/bin/par2"));
///
/// // Or auto-discover from PATH
/// let handler = CliParityHandler::from_path()
///     .expect("par2 not found in PATH");
///
/// let result = handler.verify(Path::new("download.par2")).await?;
/// # Ok(())
/// # }
/// ```
pub struct CliParityHandler {
    binary_path: PathBuf,
}

impl CliParityHandler {
    /// Create a new CLI handler with an explicit binary path
    ///
    /// # Arguments
    ///
    /// * `binary_path` - Path to the par2 binary
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find par2 in PATH
    ///
    /// Uses the `which` crate to search for the `par2` binary in the system PATH.
    ///
    /// # Returns
    ///
    /// `Some(CliParityHandler)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("par2").ok().map(Self::new)
    }
}

#[async_trait]
impl ParityHandler for CliParityHandler {
    async fn verify(&self, par2_file: &Path) -> crate::Result<VerifyResult> {
        let output = Command::new(&self.binary_path)
            .arg("v") // Verify
            .arg(par2_file)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute par2: {}", e)))?;

        parse_par2_verify_output(
            &output.stdout,
            &output.stderr,
            ExitStatus::from(output.status.success()),
        )
    }

    async fn repair(&self, par2_file: &Path) -> crate::Result<RepairResult> {
        let output = Command::new(&self.binary_path)
            .arg("r") // Repair
            .arg(par2_file)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute par2: {}", e)))?;

        parse_par2_repair_output(
            &output.stdout,
            &output.stderr,
            ExitStatus::from(output.status.success()),
        )
    }

    fn capabilities(&self) -> ParityCapabilities {
        ParityCapabilities {
            can_verify: true,
            can_repair: true,
        }
    }

    fn name(&self) -> &'static str {
        "cli-par2"
    }
}
