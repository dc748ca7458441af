use std::sync::Arc;
use std::time::Duration;

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A toast-style message for the merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub duration: Duration,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// How long notices stay visible. Errors linger longer than successes.
#[derive(Debug, Clone, Copy)]
pub struct NotificationDurations {
    pub success: Duration,
    pub error: Duration,
}

impl Default for NotificationDurations {
    fn default() -> Self {
        Self {
            success: Duration::from_secs(2),
            error: Duration::from_secs(5),
        }
    }
}

impl NotificationDurations {
    pub fn success(&self, message: impl Into<String>) -> Notice {
        Notice {
            message: message.into(),
            level: NoticeLevel::Success,
            duration: self.success,
        }
    }

    pub fn error(&self, message: impl Into<String>) -> Notice {
        Notice {
            message: message.into(),
            level: NoticeLevel::Error,
            duration: self.error,
        }
    }
}

/// Host capability that displays transient notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Host capability that shows a busy indicator.
pub trait LoadingIndicator: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Prints notices on stderr, used by the command line front-end.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => eprintln!("✓ {}", notice.message),
            NoticeLevel::Error => eprintln!("✗ {}", notice.message),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct NoopLoading;

impl LoadingIndicator for NoopLoading {
    fn start(&self) {}
    fn stop(&self) {}
}

/// Starts the indicator on creation and stops it when dropped, so early
/// returns cannot leave it spinning.
pub struct LoadingGuard {
    indicator: Arc<dyn LoadingIndicator>,
}

impl LoadingGuard {
    pub fn start(indicator: Arc<dyn LoadingIndicator>) -> Self {
        indicator.start();
        Self { indicator }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.indicator.stop();
    }
}
