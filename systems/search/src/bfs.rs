//! Unweighted breadth-first search.

use std::collections::VecDeque;

use campus_runner_core::{CellCoord, GridError, NavigationGraph, Path};

use crate::{check_endpoints, reconstruct, CellMap, SearchReport};

/// Fewest-steps path from `start` to `goal`, ignoring tile weights.
pub fn find_path<G>(graph: &G, start: CellCoord, goal: CellCoord) -> Result<Path, GridError>
where
    G: NavigationGraph + ?Sized,
{
    explore(graph, start, goal).map(|report| report.path)
}

/// Breadth-first search that also reports how many cells it expanded.
///
/// Neighbours are visited in the graph's navigation order, so ties between
/// equally short paths always resolve the same way.
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

    let dimensions = graph.dimensions();
    let mut visited = CellMap::new(dimensions, false);
    let mut parents = CellMap::new(dimensions, None);
    let mut queue = VecDeque::from([start]);
    let mut explored = 0;
    visited.set(start, true);

    while let Some(cell) = queue.pop_front() {
        explored += 1;
        if cell == goal {
            return Ok(SearchReport {
                path: reconstruct(&parents, start, goal),
                explored,
            });
        }

        for edge in graph.neighbors(cell) {
            if visited.get(edge.to).copied().unwrap_or(true) {
                continue;
            }
            visited.set(edge.to, true);
            parents.set(edge.to, Some(cell));
            queue.push_back(edge.to);
        }
    }

    Ok(SearchReport {
        path: Path::empty(),
        explored,
    })
}
