//! Toast notifications shown in the status line.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Toast::new(ToastLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Toast::new(ToastLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Toast::new(ToastLevel::Error, message)
    }

    fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Toast {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Errors linger longer than confirmations.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = match self.level {
            ToastLevel::Error => Duration::seconds(8),
            _ => Duration::seconds(4),
        };
        now - self.created_at > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_outlive_infos() {
        let info = Toast::info("saved");
        let error = Toast::error("boom");
        let later = Utc::now() + Duration::seconds(6);
        assert!(info.expired(later));
        assert!(!error.expired(later));
    }
}
