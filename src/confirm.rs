/// Asks the operator before destructive actions.
pub trait ConfirmationGate: Send + Sync {
    /// Blocks until answered. Anything but an explicit yes is a decline.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything, for `--yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl ConfirmationGate for AssumeYes {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-confirmed: {prompt}");
        true
    }
}

/// Interactive yes/no prompt on the terminal, defaulting to no.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, Default)]
pub struct InquireGate;

#[cfg(feature = "cli")]
impl ConfirmationGate for InquireGate {
    fn confirm(&self, prompt: &str) -> bool {
        match inquire::Confirm::new(prompt).with_default(false).prompt() {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Confirmation prompt failed, treating as no: {e}");
                false
            }
        }
    }
}
