//! Recent inbound messages, newest first

use std::collections::VecDeque;

use crate::midi::RawMessage;

/// Number of recent messages kept for display
pub const INCOMING_MESSAGES_CAPACITY: usize = 20;

/// Bounded log of inbound messages.
///
/// New messages go to the front; when full the oldest (back) entry is
/// dropped first.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<RawMessage>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: RawMessage) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(message);
    }

    /// Most recent message first
    pub fn iter(&self) -> impl Iterator<Item = &RawMessage> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&RawMessage> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(INCOMING_MESSAGES_CAPACITY)
    }
}
