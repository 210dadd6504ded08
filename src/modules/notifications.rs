use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ToastConfig;

pub const DEFAULT_EXPIRY: Duration = Duration::from_millis(5000);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub variant: ToastVariant,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Default)]
pub struct ToastOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub variant: ToastVariant,
}

impl ToastOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn variant(mut self, variant: ToastVariant) -> Self {
        self.variant = variant;
        self
    }
}

/// Lifecycle change of the toast set. Only sent when the set actually changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ToastEvent {
    Admitted(Toast),
    Dismissed(ToastId),
    Expired(ToastId),
    Cleared(usize),
}

struct Inner {
    expiry: Duration,
    max_visible: Option<usize>,
    next_id: AtomicU64,
    toasts: watch::Sender<Vec<Toast>>,
    timers: Mutex<HashMap<ToastId, JoinHandle<()>>>,
    events: broadcast::Sender<ToastEvent>,
}

impl Inner {
    fn remove(&self, id: ToastId) -> bool {
        self.toasts.send_if_modified(|toasts| {
            let before = toasts.len();
            toasts.retain(|t| t.id != id);
            toasts.len() != before
        })
    }

    fn cancel_timer(&self, id: ToastId) {
        if let Some(timer) = self.timers.lock().remove(&id) {
            timer.abort();
        }
    }

    fn emit(&self, event: ToastEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, timer) in self.timers.get_mut().drain() {
            timer.abort();
        }
    }
}

/// Owns the active toast set. Clones share the same set.
///
/// Every admitted toast gets an expiry task; dismissing a toast cancels its
/// task, and a task that fires after its toast is already gone does nothing.
#[derive(Clone)]
pub struct Toaster {
    inner: Arc<Inner>,
}

impl Toaster {
    pub fn new(config: &ToastConfig) -> Self {
        let (toasts, _) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                expiry: config.expiry(),
                // A limit of zero would evict every toast on admission.
                max_visible: config.max_visible.filter(|&limit| limit > 0),
                next_id: AtomicU64::new(1),
                toasts,
                timers: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Appends a toast and schedules its expiry. Requires a tokio runtime.
    pub fn admit(&self, options: ToastOptions) -> ToastHandle {
        let id = ToastId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let toast = Toast {
            id,
            title: options.title,
            description: options.description,
            variant: options.variant,
            created_at: Local::now(),
        };

        // The timer lock is held from push to registration, so a concurrent
        // dismissal always finds the timer of any toast it removes, and a
        // zero-delay timer can't fire before it is registered.
        let mut overflow = Vec::new();
        {
            let mut timers = self.inner.timers.lock();
            self.inner.toasts.send_modify(|toasts| {
                toasts.push(toast.clone());
                if let Some(limit) = self.inner.max_visible {
                    let excess = toasts.len().saturating_sub(limit);
                    overflow.extend(toasts.drain(..excess).map(|t| t.id));
                }
            });
            let timer = tokio::spawn(expire_after(
                Arc::downgrade(&self.inner),
                id,
                self.inner.expiry,
            ));
            timers.insert(id, timer);
        }
        debug!(%id, variant = ?toast.variant, "toast admitted");
        self.inner.emit(ToastEvent::Admitted(toast));

        for old in overflow {
            self.inner.cancel_timer(old);
            debug!(id = %old, "toast pushed out by visible limit");
            self.inner.emit(ToastEvent::Dismissed(old));
        }

        ToastHandle {
            id,
            toaster: self.clone(),
        }
    }

    /// Removes one toast, or every toast when `id` is `None`.
    pub fn dismiss(&self, id: Option<ToastId>) {
        match id {
            Some(id) => self.dismiss_one(id),
            None => self.dismiss_all(),
        }
    }

    fn dismiss_one(&self, id: ToastId) {
        self.inner.cancel_timer(id);
        if self.inner.remove(id) {
            debug!(%id, "toast dismissed");
            self.inner.emit(ToastEvent::Dismissed(id));
        }
    }

    pub fn dismiss_all(&self) {
        let mut cleared = Vec::new();
        self.inner.toasts.send_if_modified(|toasts| {
            cleared.extend(toasts.drain(..).map(|t| t.id));
            !cleared.is_empty()
        });
        // Only the cleared toasts: a concurrent admit may already own a fresh timer.
        for &id in &cleared {
            self.inner.cancel_timer(id);
        }
        let cleared = cleared.len();
        if cleared > 0 {
            debug!(count = cleared, "toasts cleared");
            self.inner.emit(ToastEvent::Cleared(cleared));
        }
    }

    pub fn contains(&self, id: ToastId) -> bool {
        self.inner.toasts.borrow().iter().any(|t| t.id == id)
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.toasts.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.toasts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn expiry(&self) -> Duration {
        self.inner.expiry
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.inner.toasts.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ToastEvent> {
        self.inner.events.subscribe()
    }

    #[cfg(test)]
    fn pending_timers(&self) -> usize {
        self.inner.timers.lock().len()
    }

    #[cfg(test)]
    fn untimed_toasts(&self) -> Vec<ToastId> {
        let timers = self.inner.timers.lock();
        self.toasts()
            .into_iter()
            .map(|t| t.id)
            .filter(|id| !timers.contains_key(id))
            .collect()
    }
}

async fn expire_after(inner: Weak<Inner>, id: ToastId, delay: Duration) {
    tokio::time::sleep(delay).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };
    inner.timers.lock().remove(&id);
    if inner.remove(id) {
        debug!(%id, "toast expired");
        inner.emit(ToastEvent::Expired(id));
    }
}

/// Returned by [`Toaster::admit`].
#[derive(Clone)]
pub struct ToastHandle {
    id: ToastId,
    toaster: Toaster,
}

impl ToastHandle {
    pub fn id(&self) -> ToastId {
        self.id
    }

    /// Safe to call repeatedly or after the toast expired.
    pub fn dismiss(&self) {
        self.toaster.dismiss(Some(self.id));
    }

    /// Reserved for in-place updates; currently has no effect.
    pub fn update(&self, _options: ToastOptions) {}
}
