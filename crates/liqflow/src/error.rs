use crate::jobs::api::ApiError;

/// Why a dispatch could not be started.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no settlements selected")]
    EmptySelection,

    #[error("none of the selected settlements could be found")]
    NoRecipients,

    #[error("unknown settlements: {}", .ids.join(", "))]
    UnknownSettlements { ids: Vec<String> },

    /// Drivers (by display name) whose settlement has no email address.
    #[error("recipients without email: {}", .names.join(", "))]
    MissingEmails { names: Vec<String> },

    #[error("a dispatch is already in flight")]
    Busy,

    #[error("job submission rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DispatchError {
    /// Validation failures are detected before any remote call is made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptySelection
                | Self::NoRecipients
                | Self::UnknownSettlements { .. }
                | Self::MissingEmails { .. }
        )
    }
}
