use crossterm::style::Stylize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
}

/// Single-channel sink for user-facing messages.
pub trait MessageSink {
    fn add_message(&self, message: &str, level: MessageLevel);

    fn warning(&self, message: &str) {
        self.add_message(message, MessageLevel::Warning);
    }

    fn info(&self, message: &str) {
        self.add_message(message, MessageLevel::Info);
    }
}

impl<T: MessageSink + ?Sized> MessageSink for &T {
    fn add_message(&self, message: &str, level: MessageLevel) {
        (**self).add_message(message, level)
    }
}

/// Prints messages to stderr and mirrors them into the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn add_message(&self, message: &str, level: MessageLevel) {
        match level {
            MessageLevel::Info => {
                tracing::info!(target: "messenger", "{}", message);
                eprintln!("{}", message.green());
            }
            MessageLevel::Warning => {
                tracing::warn!(target: "messenger", "{}", message);
                eprintln!("{}", format!("Warning: {}", message).yellow());
            }
        }
    }
}

/// Keeps every message; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    messages: Arc<Mutex<Vec<(MessageLevel, String)>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, _)| *level == MessageLevel::Warning)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().unwrap().is_empty()
    }
}

impl MessageSink for CollectingSink {
    fn add_message(&self, message: &str, level: MessageLevel) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_shares_buffer_across_clones() {
        let sink = CollectingSink::new();
        let handle = sink.clone();
        sink.warning("No books found for the given search criteria.");
        sink.info("Created 1 book(s).");

        assert_eq!(handle.messages().len(), 2);
        assert_eq!(
            handle.warnings(),
            vec!["No books found for the given search criteria.".to_string()]
        );
    }
}
