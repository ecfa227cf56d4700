#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first and A* path searches over any [`NavigationGraph`].
//!
//! Both searches read the graph at call time and keep no state between
//! calls, so a search issued after the grid changed always reflects the new
//! layout. Coordinates outside the grid are reported as [`GridError`];
//! an unreachable goal yields an empty [`Path`].

pub mod astar;
pub mod bfs;

use std::fmt;

use campus_runner_core::{CellCoord, GridError, NavigationGraph, Path};

/// Outcome of a search together with how much of the graph it examined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchReport {
    /// Path from start to goal, or empty when the goal is unreachable.
    pub path: Path,
    /// Number of cells removed from the frontier and expanded.
    pub explored: usize,
}

/// Selects which search strategy to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Breadth-first search minimising the number of steps.
    Bfs,
    /// A* search minimising total tile weight.
    AStar,
}

impl Algorithm {
    /// Every available algorithm in presentation order.
    pub const ALL: [Algorithm; 2] = [Algorithm::Bfs, Algorithm::AStar];

    /// Runs the selected search.
    pub fn run<G>(
        self,
        graph: &G,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<SearchReport, GridError>
    where
        G: NavigationGraph + ?Sized,
    {
        match self {
            Self::Bfs => bfs::explore(graph, start, goal),
            Self::AStar => astar::explore(graph, start, goal),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bfs => f.write_str("BFS"),
            Self::AStar => f.write_str("A*"),
        }
    }
}

/// Dense per-cell storage sized to the graph being searched.
struct CellMap<T> {
    columns: u32,
    values: Vec<T>,
}

impl<T: Clone> CellMap<T> {
    fn new(dimensions: (u32, u32), fill: T) -> Self {
        let (columns, rows) = dimensions;
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            values: vec![fill; capacity],
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        let index = row.checked_mul(width)?.checked_add(column)?;
        (index < self.values.len()).then_some(index)
    }

    fn get(&self, cell: CellCoord) -> Option<&T> {
        self.index(cell).and_then(|index| self.values.get(index))
    }

    fn set(&mut self, cell: CellCoord, value: T) {
        if let Some(slot) = self.index(cell).and_then(|index| self.values.get_mut(index)) {
            *slot = value;
        }
    }
}

/// Walks parent links back from `goal` and returns the forward path.
fn reconstruct(parents: &CellMap<Option<CellCoord>>, start: CellCoord, goal: CellCoord) -> Path {
    let mut cells = vec![goal];
    let mut current = goal;
    while current != start {
        match parents.get(current).copied().flatten() {
            Some(parent) => {
                cells.push(parent);
                current = parent;
            }
            None => return Path::empty(),
        }
    }
    cells.reverse();
    Path::new(cells)
}

fn check_endpoints<G>(graph: &G, start: CellCoord, goal: CellCoord) -> Result<(), GridError>
where
    G: NavigationGraph + ?Sized,
{
    graph.check_bounds(start)?;
    graph.check_bounds(goal)
}
