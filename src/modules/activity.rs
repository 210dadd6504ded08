use chrono::{DateTime, Local};

use super::notifications::{ToastEvent, ToastVariant};

const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivityKind {
    Admitted,
    Dismissed,
    Expired,
    Error,
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub title: String,
    pub message: String,
    pub kind: ActivityKind,
    pub timestamp: DateTime<Local>,
}

/// Newest-first history of what happened to toasts.
pub struct ActivityLog {
    pub entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, title: impl Into<String>, message: impl Into<String>, kind: ActivityKind) {
        self.entries.insert(
            0,
            ActivityEntry {
                title: title.into(),
                message: message.into(),
                kind,
                timestamp: Local::now(),
            },
        );
        if self.entries.len() > MAX_ENTRIES {
            self.entries.pop();
        }
    }

    pub fn record(&mut self, event: &ToastEvent) {
        match event {
            ToastEvent::Admitted(toast) => {
                let label = toast.title.clone().unwrap_or_else(|| toast.id.to_string());
                let variant = match toast.variant {
                    ToastVariant::Default => "default",
                    ToastVariant::Destructive => "destructive",
                };
                self.push(format!("Admitted {}", toast.id), format!("{} ({})", label, variant), ActivityKind::Admitted);
            }
            ToastEvent::Dismissed(id) => self.push(format!("Dismissed {}", id), "", ActivityKind::Dismissed),
            ToastEvent::Expired(id) => self.push(format!("Expired {}", id), "", ActivityKind::Expired),
            ToastEvent::Cleared(count) => {
                self.push("Cleared", format!("{} toast(s)", count), ActivityKind::Dismissed)
            }
        }
    }
}
