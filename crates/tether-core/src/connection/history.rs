//! Bounded connection event history

use super::types::ConnectionEvent;
use std::collections::VecDeque;

/// Fixed-capacity ring of connection events; the oldest is dropped first
#[derive(Debug, Clone)]
pub struct EventHistory {
    events: VecDeque<ConnectionEvent>,
    capacity: usize,
}

impl EventHistory {
    /// Create a history holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: ConnectionEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&ConnectionEvent> {
        self.events.back()
    }

    /// Events oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionEvent> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<ConnectionEvent> {
        self.events.iter().cloned().collect()
    }
}
