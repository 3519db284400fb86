//! UI collaborators: the trigger control, busy state and notification
//! banner. Workflows receive these by reference; nothing here is global.

use std::time::{Duration, Instant};

use crate::export::{Rasterizer, CAPABILITY_MISSING_MESSAGE};

/// Label shown when export can never work in this session.
pub const UNAVAILABLE_LABEL: &str = "PDF Export Unavailable";

/// How long a banner stays up.
pub const NOTIFICATION_TTL: Duration = Duration::from_millis(4000);

/// A button that starts an export. Disabled while an export is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerControl {
    enabled: bool,
    label: String,
    unavailable: bool,
}

impl TriggerControl {
    pub fn new(label: &str) -> Self {
        Self {
            enabled: true,
            label: label.to_string(),
            unavailable: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Enable or disable without touching the label. Has no effect once
    /// the control is unavailable.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !self.unavailable {
            self.enabled = enabled;
        }
    }

    /// Disable for the rest of the session.
    pub fn mark_unavailable(&mut self) {
        self.enabled = false;
        self.unavailable = true;
        self.label = UNAVAILABLE_LABEL.to_string();
    }

    /// Disable and relabel until the guard drops. `None` if the control is
    /// already disabled.
    pub fn begin_busy(&mut self, busy_label: &str) -> Option<BusyGuard<'_>> {
        if !self.enabled {
            return None;
        }
        let saved_label = std::mem::replace(&mut self.label, busy_label.to_string());
        self.enabled = false;
        Some(BusyGuard {
            control: self,
            saved_label,
        })
    }
}

/// Restores the control's enabled state and label on drop.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    control: &'a mut TriggerControl,
    saved_label: String,
}

impl BusyGuard<'_> {
    pub fn label(&self) -> &str {
        self.control.label()
    }

}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.control.enabled = true;
        self.control.label = std::mem::take(&mut self.saved_label);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub shown_at: Instant,
}

/// Anything that can put a message in front of the user.
pub trait Notifier {
    fn notify(&mut self, message: &str, kind: NotificationKind);
}

/// Single-banner notification area. Showing a message replaces the current
/// one; a banner disappears after [`NOTIFICATION_TTL`].
#[derive(Debug, Default)]
pub struct NotificationCenter {
    current: Option<Notification>,
    history: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: &str, kind: NotificationKind, now: Instant) {
        if let Some(previous) = self.current.take() {
            log::debug!("Replacing notification '{}'", previous.message);
        }
        match kind {
            NotificationKind::Success => log::info!("{message}"),
            NotificationKind::Error => log::warn!("{message}"),
        }
        let notification = Notification {
            message: message.to_string(),
            kind,
            shown_at: now,
        };
        self.history.push(notification.clone());
        self.current = Some(notification);
    }

    /// The banner on screen at `now`, if any.
    pub fn visible(&self, now: Instant) -> Option<&Notification> {
        self.current
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.shown_at) < NOTIFICATION_TTL)
    }

    /// Every notification shown so far, oldest first.
    pub fn history(&self) -> &[Notification] {
        &self.history
    }
}

impl Notifier for NotificationCenter {
    fn notify(&mut self, message: &str, kind: NotificationKind) {
        self.show(message, kind, Instant::now());
    }
}

/// Check the rasterizer once at startup. When it is missing the control is
/// disabled for good and the user is told why.
pub fn probe_capability(
    rasterizer: &dyn Rasterizer,
    control: &mut TriggerControl,
    notifier: &mut dyn Notifier,
) -> bool {
    if rasterizer.is_available() {
        return true;
    }
    log::error!("PDF rasterizer unavailable; export disabled");
    notifier.notify(CAPABILITY_MISSING_MESSAGE, NotificationKind::Error);
    control.mark_unavailable();
    false
}
