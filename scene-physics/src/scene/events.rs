// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Double-buffered deferred event queue
//!
//! Events posted while the queue is draining land in the secondary buffer
//! and are delivered in a later batch of the same drain. A drain that starts
//! while another is in progress is rejected, so handlers never recurse.

/// Deferred event queue with non-recursive draining
#[derive(Debug)]
pub struct EventQueue<T> {
    primary: Vec<T>,
    secondary: Vec<T>,
    draining: bool,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        EventQueue {
            primary: Vec::new(),
            secondary: Vec::new(),
            draining: false,
        }
    }
}

impl<T> EventQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event
    pub fn post(&mut self, event: T) {
        if self.draining {
            self.secondary.push(event);
        } else {
            self.primary.push(event);
        }
    }

    /// Number of undelivered events
    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty()
    }

    /// True while a drain is in progress
    pub fn is_draining(&self) -> bool {
        self.draining
    }

    /// Start a drain
    ///
    /// # Returns
    ///
    /// `false` if a drain is already in progress
    pub fn begin_drain(&mut self) -> bool {
        if self.draining {
            return false;
        }
        self.draining = true;
        true
    }

    /// Take the next batch of events, empty once the queue is exhausted
    pub fn next_batch(&mut self) -> Vec<T> {
        if !self.primary.is_empty() {
            std::mem::take(&mut self.primary)
        } else {
            std::mem::take(&mut self.secondary)
        }
    }

    /// Finish a drain started with [`begin_drain`](Self::begin_drain)
    pub fn end_drain(&mut self) {
        self.draining = false;
        let late = std::mem::take(&mut self.secondary);
        self.primary.extend(late);
    }

    /// Deliver every event, including ones posted by the handler
    ///
    /// # Returns
    ///
    /// Number of events delivered, or `None` if a drain was already running
    pub fn drain_with<F>(&mut self, mut handler: F) -> Option<usize>
    where
        F: FnMut(T, &mut Vec<T>),
    {
        if !self.begin_drain() {
            return None;
        }
        let mut delivered = 0;
        loop {
            let batch = self.next_batch();
            if batch.is_empty() {
                break;
            }
            for event in batch {
                handler(event, &mut self.secondary);
                delivered += 1;
            }
        }
        self.end_drain();
        Some(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_and_drain_in_order() {
        let mut queue = EventQueue::new();
        queue.post(1);
        queue.post(2);
        let mut seen = Vec::new();
        assert_eq!(queue.drain_with(|e, _| seen.push(e)), Some(2));
        assert_eq!(seen, vec![1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_events_posted_during_drain_are_delivered_later() {
        let mut queue = EventQueue::new();
        queue.post(3u32);
        let mut seen = Vec::new();
        queue.drain_with(|e, later| {
            seen.push(e);
            if e > 0 {
                later.push(e - 1);
            }
        });
        assert_eq!(seen, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_nested_drain_rejected() {
        let mut queue: EventQueue<u8> = EventQueue::new();
        assert!(queue.begin_drain());
        assert!(!queue.begin_drain());
        assert_eq!(queue.drain_with(|_, _| {}), None);

        queue.post(9);
        queue.end_drain();
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_draining());
    }
}
