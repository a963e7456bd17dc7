//! Transient user notifications.
//!
//! The orchestrator posts a [`Notice`] for every user-visible outcome (success,
//! information, validation warnings, failures). The presentation layer drains the
//! [`NoticeBoard`] after each action and shows the notices however it likes.

use std::fmt;

use crate::error::{ErrorKind, StudyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&StudyError> for Notice {
    fn from(err: &StudyError) -> Self {
        let severity = match err.kind() {
            ErrorKind::Validation | ErrorKind::CapabilityUnavailable => Severity::Warning,
            _ => Severity::Error,
        };
        Notice::new(severity, err.to_string())
    }
}

/// Pending notices, oldest first.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    pending: Vec<Notice>,
}

impl NoticeBoard {
    pub fn post(&mut self, notice: Notice) {
        match notice.severity {
            Severity::Error => tracing::error!("{}", notice.message),
            Severity::Warning => tracing::warn!("{}", notice.message),
            _ => tracing::debug!("{}", notice.message),
        }
        self.pending.push(notice);
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[Notice] {
        &self.pending
    }

    pub fn last(&self) -> Option<&Notice> {
        self.pending.last()
    }
}
