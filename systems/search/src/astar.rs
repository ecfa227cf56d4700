//! Weighted A* search with a Manhattan heuristic.

use std::{cmp::Ordering, collections::BinaryHeap};

use campus_runner_core::{CellCoord, GridError, NavigationGraph, Path};

use crate::{check_endpoints, reconstruct, CellMap, SearchReport};

/// Cheapest path from `start` to `goal` under the graph's edge weights.
pub fn find_path<G>(graph: &G, start: CellCoord, goal: CellCoord) -> Result<Path, GridError>
where
    G: NavigationGraph + ?Sized,
{
    explore(graph, start, goal).map(|report| report.path)
}

/// A* search that also reports how many cells it expanded.
///
/// The Manhattan distance is scaled by [`NavigationGraph::min_weight`] so it
/// never overestimates. Frontier ties on estimated cost are broken by
/// insertion order, which keeps results reproducible.
pub fn explore<G>(graph: &G, start: CellCoord, goal: CellCoord) -> Result<SearchReport, GridError>
where
    G: NavigationGraph + ?Sized,
{
    check_endpoints(graph, start, goal)?;
    if start == goal {
        return Ok(SearchReport {
            path: Path::new(vec![start]),
            explored: 1,
        });
    }

    let scale = u64::from(graph.min_weight().max(1));
    let heuristic = |cell: CellCoord| u64::from(cell.manhattan_distance(goal)) * scale;

    let dimensions = graph.dimensions();
    let mut best = CellMap::new(dimensions, u64::MAX);
    let mut parents = CellMap::new(dimensions, None);
    let mut frontier = BinaryHeap::new();
    let mut order = 0_u64;
    let mut explored = 0;

    best.set(start, 0);
    frontier.push(Frontier {
        estimate: heuristic(start),
        order,
        cost: 0,
        cell: start,
    });

    while let Some(entry) = frontier.pop() {
        if entry.cost > best.get(entry.cell).copied().unwrap_or(u64::MAX) {
            continue;
        }
        explored += 1;
        if entry.cell == goal {
            return Ok(SearchReport {
                path: reconstruct(&parents, start, goal),
                explored,
            });
        }

        for edge in graph.neighbors(entry.cell) {
            let tentative = entry.cost.saturating_add(u64::from(edge.weight));
            let known = best.get(edge.to).copied().unwrap_or(0);
            if tentative >= known {
                continue;
            }
            best.set(edge.to, tentative);
            parents.set(edge.to, Some(entry.cell));
            order += 1;
            frontier.push(Frontier {
                estimate: tentative.saturating_add(heuristic(edge.to)),
                order,
                cost: tentative,
                cell: edge.to,
            });
        }
    }

    Ok(SearchReport {
        path: Path::empty(),
        explored,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frontier {
    estimate: u64,
    order: u64,
    cost: u64,
    cell: CellCoord,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest estimate, then the oldest entry.
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
