use std::time::{Duration, Instant};

use crate::api::FetchError;

/// Severity of a status-line message; decides how long it stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Info,
    Warning,
    Error,
}

impl NotificationType {
    fn timeout(&self) -> Duration {
        match self {
            NotificationType::Info => Duration::from_secs(3),
            NotificationType::Warning => Duration::from_secs(5),
            NotificationType::Error => Duration::from_secs(10),
        }
    }
}

/// A message for the UI, e.g. a favorite being added or a page failing to load.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub notification_type: NotificationType,
    pub timestamp: Instant,
}

impl Notification {
    /// Shown for 3 s.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Info)
    }

    /// Shown for 5 s.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Warning)
    }

    /// Shown for 10 s.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationType::Error)
    }

    /// User-facing message for a failed fetch. Throttling is a warning since
    /// retrying later is expected to work.
    pub fn from_fetch_error(context: &str, error: &FetchError) -> Self {
        let message = format!("{context}: {error}");
        match error {
            FetchError::RateLimited { .. } => Self::warning(message),
            _ => Self::error(message),
        }
    }

    fn new(message: impl Into<String>, notification_type: NotificationType) -> Self {
        Self {
            message: message.into(),
            notification_type,
            timestamp: Instant::now(),
        }
    }

    /// Past its display time; `Engine::notification` stops returning it.
    pub fn should_dismiss(&self) -> bool {
        self.timestamp.elapsed() > self.notification_type.timeout()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn notification_type(&self) -> NotificationType {
        self.notification_type
    }

    pub fn remaining_time(&self) -> Duration {
        self.notification_type
            .timeout()
            .saturating_sub(self.timestamp.elapsed())
    }
}
