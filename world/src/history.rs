//! Bounded undo history kept for every actor.

use std::collections::VecDeque;

use campus_runner_core::CellCoord;

/// Position recorded before a step so it can be restored later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UndoEntry {
    cell: CellCoord,
}

impl UndoEntry {
    /// Records the cell an actor stood on before stepping away.
    #[must_use]
    pub const fn new(cell: CellCoord) -> Self {
        Self { cell }
    }

    /// Cell the entry restores.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }
}

/// Fixed-capacity last-in-first-out history that forgets its oldest entry when full.
#[derive(Clone, Debug)]
pub struct UndoHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> UndoHistory<T> {
    /// Creates an empty history; a zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records an entry, discarding the oldest one when the history is full.
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Removes and returns the most recent entry.
    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_back()
    }

    /// Most recent entry without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries retained.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forgets every recorded entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
