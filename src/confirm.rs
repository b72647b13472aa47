//! Confirmation gate before an existing grant is overwritten.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::DeliveryError;

/// What is about to happen to an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Same group: time is added to the current expiry.
    AddTime { server: String },
    /// Different group: the current group is replaced and the clock reset.
    ReplaceGroup { current: String, requested: String },
    /// An admin row already exists and will be updated.
    UpdateAdmin { name: String, group: String },
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddTime { server } => {
                write!(f, "A grant of this group already exists on {server}; time will be added")
            }
            Self::ReplaceGroup { current, requested } => {
                write!(f, "Group '{current}' will be replaced with '{requested}'")
            }
            Self::UpdateAdmin { name, group } => {
                write!(f, "Admin '{name}' already exists and will be updated to group '{group}'")
            }
        }
    }
}

/// Decides whether a delivery may overwrite an existing record.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &Confirmation) -> Result<(), DeliveryError>;
}

/// Accepts every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAccept;

#[async_trait]
impl Confirmer for AutoAccept {
    async fn confirm(&self, _prompt: &Confirmation) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Refuses every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineAll;

#[async_trait]
impl Confirmer for DeclineAll {
    async fn confirm(&self, prompt: &Confirmation) -> Result<(), DeliveryError> {
        Err(DeliveryError::ConfirmationDeclined(prompt.to_string()))
    }
}

/// Asks on the controlling terminal; anything but `y`/`yes` declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmer;

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &Confirmation) -> Result<(), DeliveryError> {
        ask(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), prompt).await
    }
}

/// Write `prompt` to `output` and accept only a `y`/`yes` line from `input`.
async fn ask<R, W>(input: R, mut output: W, prompt: &Confirmation) -> Result<(), DeliveryError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Prompt output is best-effort; an unreadable answer declines below.
    let _ = output
        .write_all(format!("{prompt}. Continue? [y/N] ").as_bytes())
        .await;
    let _ = output.flush().await;

    match input.lines().next_line().await {
        Ok(Some(answer)) if is_yes(&answer) => Ok(()),
        _ => Err(DeliveryError::ConfirmationDeclined(prompt.to_string())),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
