//! Live adjacency view used by the search engine.

use campus_runner_core::{
    CellCoord, Direction, Edge, NavigationGraph, Neighbors, TileKind, TileWeights,
};

use crate::grid::GridMap;

/// Borrowed navigation graph derived from the current grid contents.
///
/// The view holds no adjacency of its own: every call to
/// [`NavigationGraph::neighbors`] reads the tiles as they are right now, so a
/// construction site that appears between two searches is honoured by the
/// second one without any rebuild step.
///
/// Rain multiplies every weight, and a view built for an actor carrying a key
/// treats locked gates as walkway.
#[derive(Clone, Copy, Debug)]
pub struct NavigationView<'a> {
    grid: &'a GridMap,
    weights: &'a TileWeights,
    rain: u32,
    keyed: bool,
}

impl<'a> NavigationView<'a> {
    /// Creates a view over the grid that prices edges with the provided weights.
    #[must_use]
    pub const fn new(grid: &'a GridMap, weights: &'a TileWeights) -> Self {
        Self {
            grid,
            weights,
            rain: 1,
            keyed: false,
        }
    }

    /// Multiplies every weight by `multiplier`; a zero multiplier is raised to one.
    #[must_use]
    pub fn with_rain(mut self, multiplier: u32) -> Self {
        self.rain = multiplier.max(1);
        self
    }

    /// Lets the view pass through locked gates.
    #[must_use]
    pub const fn with_key(mut self, keyed: bool) -> Self {
        self.keyed = keyed;
        self
    }

    /// Grid backing the view.
    #[must_use]
    pub const fn grid(&self) -> &'a GridMap {
        self.grid
    }

    /// Cost of entering the cell, or `None` when it is impassable or outside the grid.
    #[must_use]
    pub fn weight(&self, cell: CellCoord) -> Option<u32> {
        let base = match self.grid.tile(cell).ok()? {
            TileKind::LockedGate if self.keyed => self.weights.normal,
            kind => self.weights.weight(kind)?,
        };
        Some(base.saturating_mul(self.rain))
    }
}

impl NavigationGraph for NavigationView<'_> {
    fn dimensions(&self) -> (u32, u32) {
        self.grid.dimensions()
    }

    fn neighbors(&self, cell: CellCoord) -> Neighbors {
        let mut neighbors = Neighbors::new();
        if self.weight(cell).is_none() {
            return neighbors;
        }

        for direction in Direction::NAVIGATION_ORDER {
            let Some(next) = cell.step(direction) else {
                continue;
            };
            if let Some(weight) = self.weight(next) {
                neighbors.push(Edge { to: next, weight });
            }
        }

        neighbors
    }

    fn min_weight(&self) -> u32 {
        self.weights.min_weight().saturating_mul(self.rain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_runner_core::TileKind;

    #[test]
    fn neighbors_follow_navigation_order() {
        let grid = GridMap::new(3, 3).expect("small grid");
        let weights = TileWeights::default();
        let view = NavigationView::new(&grid, &weights);

        let targets: Vec<CellCoord> = view
            .neighbors(CellCoord::new(1, 1))
            .map(|edge| edge.to)
            .collect();
        assert_eq!(
            targets,
            vec![
                CellCoord::new(1, 0),
                CellCoord::new(1, 2),
                CellCoord::new(0, 1),
                CellCoord::new(2, 1),
            ]
        );
    }

    #[test]
    fn blocked_cells_have_no_edges_in_or_out() {
        let mut grid = GridMap::new(3, 1).expect("small grid");
        let _ = grid
            .set_tile(CellCoord::new(1, 0), TileKind::Construction)
            .expect("in bounds");
        let weights = TileWeights::default();
        let view = NavigationView::new(&grid, &weights);

        assert_eq!(view.neighbors(CellCoord::new(0, 0)).count(), 0);
        assert_eq!(view.neighbors(CellCoord::new(1, 0)).count(), 0);
    }

    #[test]
    fn edges_carry_destination_weight() {
        let mut grid = GridMap::new(2, 1).expect("small grid");
        let _ = grid
            .set_tile(CellCoord::new(1, 0), TileKind::Water)
            .expect("in bounds");
        let weights = TileWeights::default();
        let view = NavigationView::new(&grid, &weights);

        let edges: Vec<Edge> = view.neighbors(CellCoord::new(0, 0)).collect();
        assert_eq!(
            edges,
            vec![Edge {
                to: CellCoord::new(1, 0),
                weight: 4,
            }]
        );
        assert_eq!(view.weight(CellCoord::new(5, 0)), None);
    }

    #[test]
    fn rain_scales_every_weight() {
        let mut grid = GridMap::new(3, 1).expect("small grid");
        let _ = grid
            .set_tile(CellCoord::new(2, 0), TileKind::Grass)
            .expect("in bounds");
        let weights = TileWeights::default();
        let view = NavigationView::new(&grid, &weights).with_rain(2);

        let costs: Vec<u32> = view
            .neighbors(CellCoord::new(1, 0))
            .map(|edge| edge.weight)
            .collect();
        assert_eq!(costs, vec![2, 4]);
        assert_eq!(view.min_weight(), 2);
        assert_eq!(
            NavigationView::new(&grid, &TileWeights::default())
                .with_rain(0)
                .min_weight(),
            1
        );
    }

    #[test]
    fn locked_gates_open_only_for_keyed_views() {
        let mut grid = GridMap::new(3, 1).expect("small grid");
        let gate = CellCoord::new(1, 0);
        let _ = grid.set_tile(gate, TileKind::LockedGate).expect("in bounds");
        let weights = TileWeights::default();

        let locked = NavigationView::new(&grid, &weights);
        assert_eq!(locked.neighbors(CellCoord::new(0, 0)).count(), 0);
        assert_eq!(locked.weight(gate), None);

        let keyed = locked.with_key(true);
        let through: Vec<CellCoord> = keyed.neighbors(gate).map(|edge| edge.to).collect();
        assert_eq!(through, vec![CellCoord::new(0, 0), CellCoord::new(2, 0)]);
        assert_eq!(keyed.weight(gate), Some(1));
    }

    #[test]
    fn view_sees_tile_changes_without_rebuilding() {
        let mut grid = GridMap::new(2, 1).expect("small grid");
        let weights = TileWeights::default();
        assert_eq!(
            NavigationView::new(&grid, &weights)
                .neighbors(CellCoord::new(0, 0))
                .count(),
            1
        );

        let _ = grid
            .set_tile(CellCoord::new(1, 0), TileKind::Wall)
            .expect("in bounds");
        assert_eq!(
            NavigationView::new(&grid, &weights)
                .neighbors(CellCoord::new(0, 0))
                .count(),
            0
        );
    }
}
