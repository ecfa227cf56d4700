//! Mutable per-actor state owned by the world.

use std::{
    collections::{BTreeSet, VecDeque},
    time::Duration,
};

use campus_runner_core::{ActorId, ActorKind, ActorSnapshot, CellCoord};

use crate::history::{UndoEntry, UndoHistory};

#[derive(Clone, Debug)]
pub(crate) struct Actor {
    pub(crate) id: ActorId,
    pub(crate) kind: ActorKind,
    pub(crate) cell: CellCoord,
    pub(crate) home: CellCoord,
    pub(crate) path: VecDeque<CellCoord>,
    pub(crate) history: UndoHistory<UndoEntry>,
    pub(crate) booster_remaining: Duration,
    pub(crate) penalty: Duration,
    pub(crate) triggered_traps: BTreeSet<CellCoord>,
    pub(crate) has_key: bool,
}

impl Actor {
    pub(crate) fn new(id: ActorId, kind: ActorKind, cell: CellCoord, undo_capacity: usize) -> Self {
        Self {
            id,
            kind,
            cell,
            home: cell,
            path: VecDeque::new(),
            history: UndoHistory::new(undo_capacity),
            booster_remaining: Duration::ZERO,
            penalty: Duration::ZERO,
            triggered_traps: BTreeSet::new(),
            has_key: false,
        }
    }

    /// Drops any assigned path, reporting whether one was present.
    pub(crate) fn clear_path(&mut self) -> bool {
        let had_path = !self.path.is_empty();
        self.path.clear();
        had_path
    }

    pub(crate) fn is_boosted(&self) -> bool {
        !self.booster_remaining.is_zero()
    }

    pub(crate) fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            kind: self.kind,
            cell: self.cell,
            home: self.home,
            path_remaining: self.path.len(),
            boosted: self.is_boosted(),
            penalty: self.penalty,
            undo_depth: self.history.len(),
            has_key: self.has_key,
        }
    }
}
