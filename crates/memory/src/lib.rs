//! Working memory for Assemble agents.
//!
//! A [`Memory`] pairs a [`DataStore`] (conversation log and typed slots)
//! with a [`ScratchPad`] (notes from earlier steps). Agents own their
//! memory behind a [`SharedMemory`] handle so callers can inspect it
//! after a run, including a failed one.

pub mod data;
pub mod scratch_pad;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use data::{DataStore, Slot};
pub use scratch_pad::{
    DropOldestStrategy, EvictionError, EvictionStrategy, ScratchPad, TruncateStrategy,
};

/// Memory shared between an agent and whoever holds a handle to it.
pub type SharedMemory = Arc<Mutex<Memory>>;

#[derive(Debug, Default)]
pub struct Memory {
    pub data: DataStore,
    pub scratch_pad: ScratchPad,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory whose scratch pad evicts with the given strategy.
    pub fn with_eviction(strategy: impl EvictionStrategy + 'static) -> Self {
        Self {
            data: DataStore::new(),
            scratch_pad: ScratchPad::new(strategy),
        }
    }

    pub fn shared(self) -> SharedMemory {
        Arc::new(Mutex::new(self))
    }

    /// Discard the conversation log and every slot.
    pub fn reset_data(&mut self) {
        self.data = DataStore::new();
    }

    /// Discard all notes, keeping the eviction strategy.
    pub fn reset_scratch_pad(&mut self) {
        self.scratch_pad.clear();
    }

    /// Reduce working memory once to make room in the prompt.
    pub fn evict(&mut self) -> Result<(), EvictionError> {
        self.scratch_pad.evict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assemble_core::Message;

    #[test]
    fn resets_are_independent() {
        let mut memory = Memory::new();
        memory.data.add_message(Message::new("user", "hi"));
        memory.data.set(Slot::Answer, "hello");
        memory.scratch_pad.push("THOUGHT: greet");

        memory.reset_scratch_pad();
        assert!(memory.scratch_pad.is_empty());
        assert_eq!(memory.data.get_all_messages().len(), 1);

        memory.reset_data();
        assert!(memory.data.get_all_messages().is_empty());
        assert!(!memory.data.exists(Slot::Answer));
    }

    #[test]
    fn reset_scratch_pad_keeps_strategy() {
        let mut memory = Memory::with_eviction(DropOldestStrategy::new(3));
        memory.scratch_pad.push("a");
        memory.reset_scratch_pad();
        assert_eq!(memory.scratch_pad.strategy_name(), "drop_oldest");
    }

    #[test]
    fn evict_delegates_to_scratch_pad() {
        let mut memory = Memory::new();
        assert_eq!(memory.evict(), Err(EvictionError::Exhausted));
        memory.scratch_pad.push("a");
        memory.scratch_pad.push("b");
        memory.evict().unwrap();
        assert_eq!(memory.scratch_pad.notes(), ["b".to_string()]);
    }

    #[tokio::test]
    async fn shared_memory_is_inspectable() {
        let shared = Memory::new().shared();
        let handle = Arc::clone(&shared);
        shared.lock().await.data.add_message(Message::new("user", "hi"));
        assert_eq!(handle.lock().await.data.get_all_messages().len(), 1);
    }
}
