use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(3);

/// 短暫提示訊息。 / Transient toast message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub duration: Duration,
    pub shown_at: Instant,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_duration(message, DEFAULT_NOTICE_DURATION)
    }

    pub fn with_duration(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            message: message.into(),
            duration,
            shown_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= self.duration
    }
}

/// 提示訊息佇列。 / Notices raised so far, oldest first; expired ones are dropped as new ones arrive.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    notices: Rc<RefCell<Vec<Notice>>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notice: Notice) {
        info!(message = %notice.message, "notice");
        let dropped = self.prune(notice.shown_at);
        if dropped > 0 {
            debug!(dropped, "expired notices dropped");
        }
        self.notices.borrow_mut().push(notice);
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    /// Notices still on screen at `now`.
    pub fn active(&self, now: Instant) -> Vec<Notice> {
        self.notices
            .borrow()
            .iter()
            .filter(|notice| !notice.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drops expired notices, returning how many were dropped.
    pub fn prune(&self, now: Instant) -> usize {
        let mut notices = self.notices.borrow_mut();
        let before = notices.len();
        notices.retain(|notice| !notice.is_expired(now));
        before - notices.len()
    }

    pub fn clear(&self) {
        self.notices.borrow_mut().clear();
    }
}
