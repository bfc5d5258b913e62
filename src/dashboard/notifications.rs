use crate::dashboard::types::{Notification, NOTIFICATION_CAPACITY};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::watch;

// newest first; the tail is evicted once `capacity` is reached
#[derive(Debug)]
pub struct NotificationLog {
    entries: Mutex<VecDeque<Notification>>,
    capacity: usize,
    revision: watch::Sender<u64>,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::with_capacity(NOTIFICATION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.saturating_add(1))),
            capacity: capacity.max(1),
            revision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    pub fn push(&self, notification: Notification) {
        {
            let mut writable = self.entries.lock();
            writable.push_front(notification);
            writable.truncate(self.capacity);
        }
        self.bump();
    }

    pub fn mark_read(&self, id: &str) -> bool {
        let changed = {
            let mut writable = self.entries.lock();
            match writable.iter_mut().find(|entry| entry.id == id) {
                Some(entry) if !entry.read => {
                    entry.read = true;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.bump();
        }
        changed
    }

    pub fn mark_all_read(&self) {
        {
            let mut writable = self.entries.lock();
            for entry in writable.iter_mut() {
                entry.read = true;
            }
        }
        self.bump();
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.bump();
    }

    pub fn list(&self) -> Vec<Notification> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.entries.lock().iter().filter(|entry| !entry.read).count()
    }
}
