//! # Message Port
//!
//! Out-of-band notifications published by a block next to its sample
//! stream. A port is a bounded FIFO: when it is full the oldest message is
//! dropped and counted, so a block never waits on a slow consumer.
//!
//! ## Example
//!
//! ```rust
//! use streamblocks_core::message_port::{Message, MessagePort};
//!
//! let mut port = MessagePort::new("status");
//! port.publish(Message::signal("update"));
//! assert_eq!(port.recv().unwrap().key(), "update");
//! ```

use std::collections::VecDeque;

/// Default queue bound for a port.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Message value types.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageValue {
    /// No value (signal/trigger).
    None,
    Int(i64),
    Float(f64),
    String(String),
}

/// A message with a key and an optional value.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    key: String,
    value: MessageValue,
}

impl Message {
    /// Create a signal message (key only, no value).
    pub fn signal(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: MessageValue::None,
        }
    }

    /// Create a message with float value.
    pub fn float(key: &str, value: f64) -> Self {
        Self {
            key: key.to_string(),
            value: MessageValue::Float(value),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &MessageValue {
        &self.value
    }

    /// True for a value-less signal message.
    pub fn is_signal(&self) -> bool {
        self.value == MessageValue::None
    }
}

/// Named outbound message port.
#[derive(Debug, Clone)]
pub struct MessagePort {
    name: String,
    queue: VecDeque<Message>,
    capacity: usize,
    published: u64,
    dropped: u64,
}

impl MessagePort {
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    /// Create with a custom queue bound (at least 1).
    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            queue: VecDeque::new(),
            capacity: capacity.max(1),
            published: 0,
            dropped: 0,
        }
    }

    /// Publish a message, dropping the oldest one if the queue is full.
    pub fn publish(&mut self, msg: Message) {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
        }
        self.queue.push_back(msg);
        self.published += 1;
    }

    /// Receive the oldest pending message.
    pub fn recv(&mut self) -> Option<Message> {
        self.queue.pop_front()
    }

    /// Drain all pending messages.
    pub fn drain(&mut self) -> Vec<Message> {
        self.queue.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total messages ever published.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Messages lost to queue overflow.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_recv_fifo() {
        let mut port = MessagePort::new("status");
        port.publish(Message::signal("a"));
        port.publish(Message::float("b", 2.0));
        assert_eq!(port.pending(), 2);
        assert_eq!(port.recv().unwrap().key(), "a");
        let b = port.recv().unwrap();
        assert_eq!(*b.value(), MessageValue::Float(2.0));
        assert!(!b.is_signal());
        assert!(port.recv().is_none());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut port = MessagePort::with_capacity("small", 2);
        port.publish(Message::signal("a"));
        port.publish(Message::signal("b"));
        port.publish(Message::signal("c"));
        assert_eq!(port.pending(), 2);
        assert_eq!(port.dropped(), 1);
        assert_eq!(port.published(), 3);
        let keys: Vec<String> = port.drain().iter().map(|m| m.key().to_string()).collect();
        assert_eq!(keys, vec!["b", "c"]);
        assert_eq!(port.pending(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut port = MessagePort::with_capacity("tiny", 0);
        port.publish(Message::signal("x"));
        assert_eq!(port.pending(), 1);
        assert_eq!(port.name(), "tiny");
    }
}
