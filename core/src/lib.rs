#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Campus Runner navigation engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views such as any [`NavigationGraph`], and respond exclusively with new
//! command batches.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

mod rules;

pub use rules::{Rules, RulesError, TileWeights};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Discards the current game and lays out a fresh all-normal grid.
    ConfigureGrid {
        /// Number of cell columns in the grid.
        columns: u32,
        /// Number of cell rows in the grid.
        rows: u32,
    },
    /// Overwrites the tile kind stored at a cell.
    SetTile {
        /// Cell receiving the new tile.
        cell: CellCoord,
        /// Tile kind written into the cell.
        kind: TileKind,
    },
    /// Marks two cells as portals that relocate actors onto each other.
    LinkPortals {
        /// First portal cell.
        entrance: CellCoord,
        /// Second portal cell.
        exit: CellCoord,
    },
    /// Places a new actor onto a walkable cell.
    SpawnActor {
        /// Role of the actor.
        kind: ActorKind,
        /// Cell the actor starts on.
        cell: CellCoord,
    },
    /// Requests that an actor advance a single step in the specified direction.
    StepActor {
        /// Identifier of the actor attempting to move.
        actor: ActorId,
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Rolls an actor back to the position recorded before its latest step.
    Undo {
        /// Identifier of the actor to roll back.
        actor: ActorId,
    },
    /// Hands an actor a path to play back one cell at a time.
    AssignPath {
        /// Identifier of the actor receiving the path.
        actor: ActorId,
        /// Path to follow; may start at the actor's current cell.
        path: Path,
    },
    /// Advances an actor by one element of its assigned path.
    FollowPath {
        /// Identifier of the actor to advance.
        actor: ActorId,
    },
    /// Requests a construction site of `count` adjacent cells near a reference point.
    SpawnConstruction {
        /// Reference cell the site should be placed around.
        near: CellCoord,
        /// Number of cells the site should block.
        count: usize,
    },
    /// Requests a fire drill that blocks up to `count` of the candidate cells.
    ///
    /// Candidates are tried in order; cells that are not plain walkway or that
    /// hold an actor are passed over.
    SpawnFireDrill {
        /// Cells the drill may block, in order of preference.
        candidates: Vec<CellCoord>,
        /// Number of cells the drill should block.
        count: usize,
    },
    /// Starts a shower that multiplies every movement cost, or extends the current one.
    StartRain,
    /// Removes an active construction site before its time-to-live elapses.
    ClearConstruction {
        /// Identifier of the site to clear.
        site: ConstructionId,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that a new grid replaced the previous game state.
    GridConfigured {
        /// Number of cell columns in the grid.
        columns: u32,
        /// Number of cell rows in the grid.
        rows: u32,
    },
    /// Confirms that a cell changed its tile kind.
    TileChanged {
        /// Cell whose tile changed.
        cell: CellCoord,
        /// Tile kind stored before the change.
        from: TileKind,
        /// Tile kind stored after the change.
        to: TileKind,
    },
    /// Confirms that two portal cells were paired.
    PortalsLinked {
        /// First portal cell.
        entrance: CellCoord,
        /// Second portal cell.
        exit: CellCoord,
    },
    /// Confirms that an actor entered the grid.
    ActorSpawned {
        /// Identifier allocated to the actor.
        actor: ActorId,
        /// Role of the actor.
        kind: ActorKind,
        /// Cell the actor occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that an actor could not be placed on the requested cell.
    SpawnRejected {
        /// Cell provided in the spawn request.
        cell: CellCoord,
        /// Why the cell cannot hold an actor.
        reason: BlockReason,
    },
    /// Confirms that an actor moved between two cells.
    ActorMoved {
        /// Identifier of the actor that moved.
        actor: ActorId,
        /// Cell occupied before moving.
        from: CellCoord,
        /// Cell occupied after the move and every tile effect resolved.
        to: CellCoord,
    },
    /// Reports that a step was refused without changing any state.
    StepBlocked {
        /// Identifier of the actor that attempted the step.
        actor: ActorId,
        /// Direction of the refused step.
        direction: Direction,
        /// Why the destination refused the actor.
        reason: BlockReason,
    },
    /// Reports that a special tile acted on an actor.
    TileEffectApplied {
        /// Identifier of the affected actor.
        actor: ActorId,
        /// Cell whose tile produced the effect.
        cell: CellCoord,
        /// Effect that was applied.
        effect: TileEffect,
    },
    /// Confirms that an undo request restored an earlier position.
    ActorRestored {
        /// Identifier of the restored actor.
        actor: ActorId,
        /// Cell occupied before the undo.
        from: CellCoord,
        /// Cell restored from the history.
        to: CellCoord,
    },
    /// Reports that the recorded cell became unwalkable, so the undo entry was kept.
    UndoBlocked {
        /// Identifier of the actor that asked to undo.
        actor: ActorId,
        /// Cell recorded in the history.
        cell: CellCoord,
        /// Why the recorded cell refuses the actor.
        reason: BlockReason,
    },
    /// Reports that an undo request found an empty history.
    UndoUnavailable {
        /// Identifier of the actor with no recorded steps.
        actor: ActorId,
    },
    /// Confirms that an actor accepted a path for playback.
    PathAssigned {
        /// Identifier of the actor following the path.
        actor: ActorId,
        /// Final cell of the path.
        goal: CellCoord,
        /// Number of steps left to play back.
        steps: usize,
    },
    /// Reports that a path can no longer be followed and must be recomputed.
    PathInvalidated {
        /// Identifier of the actor whose path was dropped.
        actor: ActorId,
        /// Cell that blocked the path, if the grid changed underneath it.
        blocked: Option<CellCoord>,
    },
    /// Reports that an actor consumed the final element of its path.
    PathCompleted {
        /// Identifier of the actor that arrived.
        actor: ActorId,
    },
    /// Confirms that a construction site blocked a group of cells.
    ConstructionStarted {
        /// Identifier allocated to the site.
        site: ConstructionId,
        /// What put the site up.
        kind: SiteKind,
        /// Cells blocked by the site.
        cells: Vec<CellCoord>,
        /// Simulation time at which the site expires.
        expires_at: Duration,
    },
    /// Reports that a construction request found too few eligible cells.
    ConstructionSkipped {
        /// Reference cell provided in the request.
        near: CellCoord,
        /// Number of cells requested.
        count: usize,
    },
    /// Reports that none of the fire drill candidates could be blocked.
    FireDrillSkipped {
        /// Number of cells requested.
        count: usize,
    },
    /// Confirms that a construction site released its cells.
    ConstructionEnded {
        /// Identifier of the site.
        site: ConstructionId,
        /// Cells restored to their earlier tile kinds.
        cells: Vec<CellCoord>,
        /// Whether the site expired or was cleared explicitly.
        reason: ConstructionEnd,
    },
    /// Confirms that rain started or was extended.
    RainStarted {
        /// Factor applied to every movement cost while it rains.
        multiplier: u32,
        /// Simulation time at which the rain stops.
        ends_at: Duration,
    },
    /// Reports that the rain stopped and movement costs are back to normal.
    RainStopped,
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
}

/// Programming errors surfaced immediately to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A coordinate lies outside the grid.
    #[error("cell {cell} lies outside the {columns}x{rows} grid")]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
        /// Number of columns in the grid.
        columns: u32,
        /// Number of rows in the grid.
        rows: u32,
    },
    /// A grid was requested with more cells than the world will allocate.
    #[error("a {columns}x{rows} grid exceeds the cell limit")]
    GridTooLarge {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// A command referenced an actor the world never spawned.
    #[error("actor {actor} does not exist")]
    UnknownActor {
        /// Offending identifier.
        actor: ActorId,
    },
}

/// Cardinal movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
    /// Movement toward increasing column indices.
    East,
}

impl Direction {
    /// Fixed exploration order (up, down, left, right) that keeps searches reproducible.
    pub const NAVIGATION_ORDER: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Direction of a single orthogonal step between two cells, if they are adjacent.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());

        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row() > from.row() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Unique identifier assigned to an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// Creates a new actor identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier assigned to a construction site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructionId(u32);

impl ConstructionId {
    /// Creates a new site identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Role an actor plays on the campus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// The keyboard-driven player.
    Player,
    /// A computer-controlled character.
    Npc(NpcKind),
}

/// Flavours of computer-controlled characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcKind {
    /// Wanders between landmarks.
    Student,
    /// Patrols and chases the player when close.
    Guard,
    /// Mostly stands around.
    Professor,
    /// Clears construction sites when the player asks for help.
    LabAssistant,
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Neighbouring cell in the provided direction.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant;
    /// callers still need to check the far edges against their grid.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
            Direction::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Terrain classification stored in every grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Plain walkway.
    Normal,
    /// Building wall; never walkable.
    Wall,
    /// Slippery floor that keeps actors sliding in their direction of travel.
    Ice,
    /// Lawn that is walkable but slower to cross.
    Grass,
    /// Shallow water that is walkable but much slower to cross.
    Water,
    /// Teleporter paired with another portal cell.
    Portal,
    /// Costs the actor a time penalty the first time it is entered.
    Trap,
    /// Grants a temporary speed multiplier.
    Booster,
    /// Cell held by an active construction site; never walkable.
    Construction,
    /// Hands a key to every actor that enters it.
    Key,
    /// Gate that opens for an actor carrying a key and stays open afterwards.
    LockedGate,
}

impl TileKind {
    /// Reports whether actors may occupy or cross tiles of this kind.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        match self {
            Self::Normal
            | Self::Ice
            | Self::Grass
            | Self::Water
            | Self::Portal
            | Self::Trap
            | Self::Booster
            | Self::Key => true,
            Self::Wall | Self::Construction | Self::LockedGate => false,
        }
    }
}

/// Why a cell refused an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// The step would leave the grid.
    Edge,
    /// The destination tile is not walkable.
    Terrain {
        /// Tile kind that blocked the actor.
        kind: TileKind,
    },
}

/// Special-tile effects reported after a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileEffect {
    /// The actor slid across consecutive ice cells.
    Slid {
        /// Number of extra cells travelled while sliding.
        distance: u32,
    },
    /// The actor was relocated by a portal.
    Teleported {
        /// Portal cell the actor left from.
        from: CellCoord,
    },
    /// The actor triggered a trap and lost time.
    TrapTriggered {
        /// Time penalty charged to the actor.
        penalty: Duration,
    },
    /// The actor picked up a temporary speed boost.
    Boosted {
        /// How long the boost lasts.
        duration: Duration,
    },
    /// The actor picked up a key.
    KeyCollected,
    /// The actor's key opened a locked gate.
    GateUnlocked,
}

/// What put a temporary blocking site up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteKind {
    /// Clustered construction near a reference cell.
    Construction,
    /// Scattered cells closed for a fire drill.
    FireDrill,
}

/// How a construction site came to an end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstructionEnd {
    /// The site's time-to-live elapsed.
    Expired,
    /// The site was cleared on request.
    Cleared,
}

/// Ordered sequence of cells from a start to a goal, inclusive.
///
/// An empty path signals that the goal is unreachable. Paths are plain values:
/// whoever requested one owns it, and nothing in the world keeps a reference
/// that could silently go stale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Wraps an ordered cell sequence.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>) -> Self {
        Self { cells }
    }

    /// The "no path found" value.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reports whether the path is empty, meaning the goal was unreachable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of cells in the path, including start and goal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Number of moves needed to walk the path.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// First cell of the path.
    #[must_use]
    pub fn start(&self) -> Option<CellCoord> {
        self.cells.first().copied()
    }

    /// Last cell of the path.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }

    /// Reports whether the path passes through the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Ordered cells of the path.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Consumes the path, yielding the underlying cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<CellCoord> {
        self.cells
    }

    /// Sums the cost of entering every cell after the start.
    ///
    /// Returns `None` when `weight` reports a cell as impassable.
    pub fn cost_with<F>(&self, mut weight: F) -> Option<u64>
    where
        F: FnMut(CellCoord) -> Option<u32>,
    {
        self.cells
            .iter()
            .skip(1)
            .try_fold(0_u64, |total, cell| Some(total + u64::from(weight(*cell)?)))
    }
}

/// Directed, weighted connection to a neighbouring cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Destination cell.
    pub to: CellCoord,
    /// Cost of entering the destination cell.
    pub weight: u32,
}

/// Up to four outgoing edges of a cell, yielded in [`Direction::NAVIGATION_ORDER`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neighbors {
    edges: [Option<Edge>; 4],
    len: usize,
    cursor: usize,
}

impl Neighbors {
    /// Creates an empty neighbour list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an edge; edges beyond the fourth are ignored.
    pub fn push(&mut self, edge: Edge) {
        if let Some(slot) = self.edges.get_mut(self.len) {
            *slot = Some(edge);
            self.len += 1;
        }
    }
}

impl Iterator for Neighbors {
    type Item = Edge;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.len {
            let edge = self.edges[self.cursor];
            self.cursor += 1;
            if edge.is_some() {
                return edge;
            }
        }
        None
    }
}

/// Live adjacency view over a grid.
///
/// Implementations must answer from current grid state at call time and
/// must never report edges into or out of unwalkable cells.
pub trait NavigationGraph {
    /// Grid dimensions as `(columns, rows)`.
    fn dimensions(&self) -> (u32, u32);

    /// Walkable orthogonal neighbours of `cell` in navigation order.
    fn neighbors(&self, cell: CellCoord) -> Neighbors;

    /// Smallest edge weight the graph can report, used to scale heuristics.
    fn min_weight(&self) -> u32 {
        1
    }

    /// Reports whether the cell lies inside the grid.
    fn contains(&self, cell: CellCoord) -> bool {
        let (columns, rows) = self.dimensions();
        cell.column() < columns && cell.row() < rows
    }

    /// Fails with [`GridError::OutOfBounds`] when the cell lies outside the grid.
    fn check_bounds(&self, cell: CellCoord) -> Result<(), GridError> {
        if self.contains(cell) {
            Ok(())
        } else {
            let (columns, rows) = self.dimensions();
            Err(GridError::OutOfBounds {
                cell,
                columns,
                rows,
            })
        }
    }
}

/// Immutable representation of a single actor's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorSnapshot {
    /// Unique identifier assigned to the actor.
    pub id: ActorId,
    /// Role of the actor.
    pub kind: ActorKind,
    /// Cell currently occupied by the actor.
    pub cell: CellCoord,
    /// Cell the actor was spawned on.
    pub home: CellCoord,
    /// Steps left in the actor's assigned path.
    pub path_remaining: usize,
    /// Indicates whether a booster is currently active.
    pub boosted: bool,
    /// Total time penalty accumulated from traps.
    pub penalty: Duration,
    /// Number of undo entries currently recorded.
    pub undo_depth: usize,
    /// Indicates whether the actor carries a key for locked gates.
    pub has_key: bool,
}

/// Read-only snapshot describing all actors on the grid.
#[derive(Clone, Debug, Default)]
pub struct ActorView {
    snapshots: Vec<ActorSnapshot>,
}

impl ActorView {
    /// Creates a new actor view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ActorSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured actor snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.snapshots.iter()
    }

    /// First actor controlled by the keyboard, if any.
    #[must_use]
    pub fn player(&self) -> Option<&ActorSnapshot> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.kind == ActorKind::Player)
    }

    /// Snapshot of the actor with the provided identifier.
    #[must_use]
    pub fn get(&self, actor: ActorId) -> Option<&ActorSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == actor)
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ActorSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of an active construction site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructionSnapshot {
    /// Identifier allocated to the site.
    pub id: ConstructionId,
    /// What put the site up.
    pub kind: SiteKind,
    /// Cells currently blocked by the site.
    pub cells: Vec<CellCoord>,
    /// Simulation time at which the site was spawned.
    pub spawned_at: Duration,
    /// Simulation time at which the site expires.
    pub expires_at: Duration,
}
