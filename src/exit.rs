// src/exit.rs
//! Standardized process exit codes for `fence`.
//!
//! Provides a stable contract for scripts and automation.

use std::process::Termination;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FenceExit {
    /// No error diagnostics were produced (warnings allowed).
    Success = 0,
    /// At least one error diagnostic was produced.
    CheckFailed = 1,
    /// Configuration was invalid or could not be read.
    ConfigError = 2,
    /// Internal error (panic in the core).
    Internal = 3,
}

impl FenceExit {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl Termination for FenceExit {
    fn report(self) -> std::process::ExitCode {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        std::process::ExitCode::from(self.code() as u8)
    }
}

impl From<anyhow::Result<FenceExit>> for FenceExit {
    fn from(res: anyhow::Result<FenceExit>) -> Self {
        match res {
            Ok(exit) => exit,
            Err(e) => {
                eprintln!("Error: {e:#}");
                Self::ConfigError
            }
        }
    }
}
