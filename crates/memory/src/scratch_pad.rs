//! Scratch pad: short notes from earlier steps, shrunk under context pressure.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvictionError {
    /// Nothing left to remove.
    #[error("scratch pad cannot be reduced any further")]
    Exhausted,

    /// The strategy returned a sequence that is not shorter than its input.
    #[error("eviction strategy '{strategy}' did not shrink the scratch pad ({before} -> {after} notes)")]
    NoProgress {
        strategy: String,
        before: usize,
        after: usize,
    },
}

/// Policy for shrinking the scratch pad when a prompt grows too large.
///
/// Implementations remove from the oldest end and must return strictly
/// fewer notes than they were given, or [`EvictionError::Exhausted`].
pub trait EvictionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn reduce(&self, notes: &[String]) -> Result<Vec<String>, EvictionError>;
}

/// Keep only the most recent note; a lone note is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncateStrategy;

impl EvictionStrategy for TruncateStrategy {
    fn name(&self) -> &str {
        "truncate"
    }

    fn reduce(&self, notes: &[String]) -> Result<Vec<String>, EvictionError> {
        match notes {
            [] => Err(EvictionError::Exhausted),
            [_] => Ok(Vec::new()),
            [.., last] => Ok(vec![last.clone()]),
        }
    }
}

/// Drop the `count` oldest notes per eviction.
#[derive(Debug, Clone, Copy)]
pub struct DropOldestStrategy {
    count: usize,
}

impl DropOldestStrategy {
    /// A count of zero is treated as one.
    pub fn new(count: usize) -> Self {
        Self {
            count: count.max(1),
        }
    }
}

impl EvictionStrategy for DropOldestStrategy {
    fn name(&self) -> &str {
        "drop_oldest"
    }

    fn reduce(&self, notes: &[String]) -> Result<Vec<String>, EvictionError> {
        if notes.is_empty() {
            return Err(EvictionError::Exhausted);
        }
        let skip = self.count.min(notes.len());
        Ok(notes[skip..].to_vec())
    }
}

pub struct ScratchPad {
    notes: Vec<String>,
    strategy: Box<dyn EvictionStrategy>,
}

impl std::fmt::Debug for ScratchPad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchPad")
            .field("notes", &self.notes)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Default for ScratchPad {
    fn default() -> Self {
        Self::new(TruncateStrategy)
    }
}

impl ScratchPad {
    pub fn new(strategy: impl EvictionStrategy + 'static) -> Self {
        Self {
            notes: Vec::new(),
            strategy: Box::new(strategy),
        }
    }

    pub fn push(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Notes from oldest to newest.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Render the notes as a bulleted block, oldest first.
    pub fn render(&self) -> String {
        self.notes
            .iter()
            .map(|note| format!("- {note}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Shrink the notes once with the configured strategy.
    pub fn evict(&mut self) -> Result<(), EvictionError> {
        let before = self.notes.len();
        let reduced = self.strategy.reduce(&self.notes)?;
        if reduced.len() >= before {
            return Err(EvictionError::NoProgress {
                strategy: self.strategy.name().to_string(),
                before,
                after: reduced.len(),
            });
        }
        debug!(
            strategy = self.strategy.name(),
            before,
            after = reduced.len(),
            "Evicted scratch pad notes"
        );
        self.notes = reduced;
        Ok(())
    }
}
