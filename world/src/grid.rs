//! Dense tile storage backing the campus map.

use campus_runner_core::{CellCoord, GridError, TileKind};

const DEFAULT_COLUMNS: u32 = 20;
const DEFAULT_ROWS: u32 = 18;

/// Dense row-major grid of tile kinds with dimensions fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridMap {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
}

impl GridMap {
    /// Largest number of cells a grid may hold.
    pub const MAX_CELLS: u64 = 1 << 20;

    /// Creates a grid of the provided size where every tile is [`TileKind::Normal`].
    ///
    /// Fails with [`GridError::GridTooLarge`] when the grid would hold more
    /// than [`GridMap::MAX_CELLS`] cells.
    pub fn new(columns: u32, rows: u32) -> Result<Self, GridError> {
        let cells = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(cells)
            .ok()
            .filter(|_| cells <= Self::MAX_CELLS)
            .ok_or(GridError::GridTooLarge { columns, rows })?;
        Ok(Self {
            columns,
            rows,
            tiles: vec![TileKind::Normal; capacity],
        })
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Grid dimensions as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Fails with [`GridError::OutOfBounds`] when the cell lies outside the grid.
    pub fn check(&self, cell: CellCoord) -> Result<(), GridError> {
        self.index(cell).map(|_| ()).ok_or(GridError::OutOfBounds {
            cell,
            columns: self.columns,
            rows: self.rows,
        })
    }

    /// Tile kind stored at the cell.
    pub fn tile(&self, cell: CellCoord) -> Result<TileKind, GridError> {
        self.check(cell)?;
        self.index(cell)
            .and_then(|index| self.tiles.get(index).copied())
            .ok_or(GridError::OutOfBounds {
                cell,
                columns: self.columns,
                rows: self.rows,
            })
    }

    /// Reports whether an actor may currently occupy the cell.
    ///
    /// Cells outside the grid are never walkable; use [`GridMap::tile`] when an
    /// out-of-range coordinate should be reported instead.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.tile(cell).map_or(false, TileKind::is_walkable)
    }

    /// Overwrites the tile kind at the cell, returning the kind it replaced.
    pub fn set_tile(&mut self, cell: CellCoord, kind: TileKind) -> Result<TileKind, GridError> {
        self.check(cell)?;
        let columns = self.columns;
        let rows = self.rows;
        let slot = self
            .index(cell)
            .and_then(|index| self.tiles.get_mut(index))
            .ok_or(GridError::OutOfBounds {
                cell,
                columns,
                rows,
            })?;
        Ok(std::mem::replace(slot, kind))
    }

    /// Iterator over every cell and its tile kind in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, TileKind)> + '_ {
        let columns = self.columns.max(1);
        (0_u32..)
            .zip(self.tiles.iter().copied())
            .map(move |(offset, kind)| (CellCoord::new(offset % columns, offset / columns), kind))
    }

    /// Number of walkable cells currently in the grid.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.tiles.iter().filter(|kind| kind.is_walkable()).count()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

impl Default for GridMap {
    /// The 20x18 campus every new world starts with.
    fn default() -> Self {
        let capacity = (DEFAULT_COLUMNS * DEFAULT_ROWS) as usize;
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            tiles: vec![TileKind::Normal; capacity],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_all_normal() {
        let grid = GridMap::new(3, 2).expect("small grid");
        assert_eq!(grid.cells().count(), 6);
        assert!(grid.cells().all(|(_, kind)| kind == TileKind::Normal));
        assert_eq!(grid.walkable_count(), 6);
    }

    #[test]
    fn set_tile_reports_previous_kind() {
        let mut grid = GridMap::new(3, 3).expect("small grid");
        let cell = CellCoord::new(1, 2);
        assert_eq!(grid.set_tile(cell, TileKind::Wall), Ok(TileKind::Normal));
        assert_eq!(grid.tile(cell), Ok(TileKind::Wall));
        assert!(!grid.is_walkable(cell));
        assert_eq!(grid.set_tile(cell, TileKind::Ice), Ok(TileKind::Wall));
        assert!(grid.is_walkable(cell));
    }

    #[test]
    fn out_of_bounds_access_is_reported() {
        let mut grid = GridMap::new(4, 3).expect("small grid");
        let outside = CellCoord::new(4, 0);
        let expected = Err(GridError::OutOfBounds {
            cell: outside,
            columns: 4,
            rows: 3,
        });
        assert_eq!(grid.tile(outside), expected);
        assert_eq!(grid.set_tile(outside, TileKind::Wall), expected);
        assert!(!grid.is_walkable(outside));
    }

    #[test]
    fn oversized_grids_are_refused() {
        assert_eq!(
            GridMap::new(u32::MAX, u32::MAX),
            Err(GridError::GridTooLarge {
                columns: u32::MAX,
                rows: u32::MAX,
            })
        );
        assert!(GridMap::new(1025, 1024).is_err());
        assert!(GridMap::new(1024, 1024).is_ok());
        assert_eq!(GridMap::default().dimensions(), (20, 18));
        assert_eq!(GridMap::new(0, 5).map(|grid| grid.walkable_count()), Ok(0));
    }

    #[test]
    fn cells_iterate_in_row_major_order() {
        let grid = GridMap::new(2, 2).expect("small grid");
        let cells: Vec<CellCoord> = grid.cells().map(|(cell, _)| cell).collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 1),
            ]
        );
    }
}
