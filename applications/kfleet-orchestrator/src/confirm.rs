//! Operator confirmation prompts

use std::io::Write;

use crate::error::Result;

/// Blocking yes/no prompt used at batch decision points
pub trait ConfirmationGate {
    /// Ask a yes/no question; `Ok(true)` means the operator approved
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Interactive `[y/N]` prompt on stdin, defaulting to "no"
pub struct StdinGate;

impl ConfirmationGate for StdinGate {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{prompt} [y/N]: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_lowercase().starts_with('y'))
    }
}
