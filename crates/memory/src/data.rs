//! Data store: the conversation log plus typed values shared between states.

use std::collections::HashMap;

use assemble_core::error::MemoryError;
use assemble_core::message::Message;
use serde::{Deserialize, Serialize};

/// Named values states hand to each other within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// The most recent reasoning step
    LastThought,
    /// The most recent tool call and its result
    LastAction,
    /// The latest message rewritten with conversation context
    RewrittenQuestion,
    /// A summary of the conversation so far
    Summary,
    /// The final answer of a run
    Answer,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::LastThought => "last_thought",
            Slot::LastAction => "last_action",
            Slot::RewrittenQuestion => "rewritten_question",
            Slot::Summary => "summary",
            Slot::Answer => "answer",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataStore {
    messages: Vec<Message>,
    values: HashMap<Slot, String>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in arrival order.
    pub fn get_all_messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recently appended message.
    pub fn get_current_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Like [`DataStore::get_current_message`], but an empty log is an error.
    pub fn require_current_message(&self) -> Result<&Message, MemoryError> {
        self.messages.last().ok_or(MemoryError::EmptyMessageLog)
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn set(&mut self, slot: Slot, value: impl Into<String>) {
        self.values.insert(slot, value.into());
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }

    pub fn require(&self, slot: Slot) -> Result<&str, MemoryError> {
        self.get(slot)
            .ok_or_else(|| MemoryError::MissingSlot(slot.to_string()))
    }

    pub fn exists(&self, slot: Slot) -> bool {
        self.values.contains_key(&slot)
    }

    pub fn pop(&mut self, slot: Slot) -> Option<String> {
        self.values.remove(&slot)
    }

    pub fn remove(&mut self, slot: Slot) {
        self.values.remove(&slot);
    }

    /// Render the log as `name: content` lines.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(Message::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_keep_insertion_order() {
        let mut store = DataStore::new();
        for i in 0..5 {
            store.add_message(Message::new("user", format!("message {i}")));
        }

        let contents: Vec<_> = store
            .get_all_messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec!["message 0", "message 1", "message 2", "message 3", "message 4"]
        );
        assert_eq!(store.get_current_message().unwrap().content, "message 4");

        store.clear_messages();
        assert!(store.get_all_messages().is_empty());
    }

    #[test]
    fn current_message_of_empty_log() {
        let store = DataStore::new();
        assert!(store.get_current_message().is_none());
        assert!(matches!(
            store.require_current_message(),
            Err(MemoryError::EmptyMessageLog)
        ));
    }

    #[test]
    fn slot_values() {
        let mut store = DataStore::new();
        assert!(!store.exists(Slot::LastThought));
        assert!(matches!(
            store.require(Slot::LastThought),
            Err(MemoryError::MissingSlot(name)) if name == "last_thought"
        ));

        store.set(Slot::LastThought, "use the calculator");
        assert!(store.exists(Slot::LastThought));
        assert_eq!(store.get(Slot::LastThought), Some("use the calculator"));

        store.set(Slot::LastThought, "search instead");
        assert_eq!(store.pop(Slot::LastThought).as_deref(), Some("search instead"));
        assert!(store.get(Slot::LastThought).is_none());

        store.set(Slot::Summary, "short");
        store.remove(Slot::Summary);
        assert!(!store.exists(Slot::Summary));
    }

    #[test]
    fn transcript_renders_each_message() {
        let mut store = DataStore::new();
        store.add_message(Message::new("user", "What color is the sky?"));
        store.add_message(Message::new("assistant", "Blue."));
        assert_eq!(store.transcript(), "user: What color is the sky?\nassistant: Blue.");
    }
}
