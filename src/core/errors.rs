//! Typed failures surfaced by the timer feature
//!
//! Parse failures carry the offending token so the host can echo it back
//! to the user verbatim.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use thiserror::Error;

/// A raw expression that could not be turned into a timer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No timespec grammar matched the whole input.
    #[error("Unable to parse timer for '{0}'")]
    Unrecognized(String),

    /// A grammar matched but its clock token fits no known time format.
    #[error("Failed to parse time '{0}'")]
    BadClock(String),

    /// The weekday token is neither a weekday name nor an abbreviation.
    #[error("Failed to parse weekday '{0}'")]
    BadWeekday(String),

    /// The month/day tokens do not name a real calendar date.
    #[error("Failed to parse day '{0}'")]
    BadMonthDay(String),
}

/// Lifecycle failures from the per-user timer registry.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The user already has a timer under this description.
    #[error("Timer already exists.")]
    DuplicateDescription(String),

    /// No live timer under this description for this user.
    #[error("Timer '{0}' not found.")]
    NotFound(String),

    /// The persistence collaborator rejected a write.
    #[error("failed to persist timers: {0}")]
    Store(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages_name_the_token() {
        assert_eq!(
            ParseError::BadClock("25:99".to_string()).to_string(),
            "Failed to parse time '25:99'"
        );
        assert_eq!(
            ParseError::BadWeekday("funday".to_string()).to_string(),
            "Failed to parse weekday 'funday'"
        );
    }

    #[test]
    fn test_timer_error_messages() {
        assert_eq!(
            TimerError::DuplicateDescription("coffee".to_string()).to_string(),
            "Timer already exists."
        );
        assert_eq!(
            TimerError::NotFound("coffee".to_string()).to_string(),
            "Timer 'coffee' not found."
        );
    }
}
