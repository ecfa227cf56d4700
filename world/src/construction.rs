//! Registry of temporary blocking sites and the cell pickers that place them.

use std::{
    collections::{BTreeSet, VecDeque},
    time::Duration,
};

use campus_runner_core::{
    CellCoord, ConstructionId, ConstructionSnapshot, Direction, SiteKind, TileKind,
};

use crate::grid::GridMap;

/// Seeds further than this from the reference cell are not considered "near".
const NEARBY_RADIUS: u32 = 4;

/// Active construction site together with the tiles it displaced.
#[derive(Clone, Debug)]
pub(crate) struct Site {
    pub(crate) id: ConstructionId,
    pub(crate) kind: SiteKind,
    pub(crate) blocked: Vec<(CellCoord, TileKind)>,
    pub(crate) spawned_at: Duration,
    pub(crate) ttl: Duration,
}

impl Site {
    pub(crate) fn cells(&self) -> Vec<CellCoord> {
        self.blocked.iter().map(|(cell, _)| *cell).collect()
    }

    pub(crate) fn expires_at(&self) -> Duration {
        self.spawned_at.saturating_add(self.ttl)
    }

    fn is_active(&self, now: Duration) -> bool {
        now.saturating_sub(self.spawned_at) < self.ttl
    }
}

/// Sites ordered by identifier.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConstructionSites {
    sites: Vec<Site>,
    next_id: u32,
}

impl ConstructionSites {
    pub(crate) fn open(
        &mut self,
        kind: SiteKind,
        blocked: Vec<(CellCoord, TileKind)>,
        spawned_at: Duration,
        ttl: Duration,
    ) -> &Site {
        let id = ConstructionId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.sites.push(Site {
            id,
            kind,
            blocked,
            spawned_at,
            ttl,
        });
        let last = self.sites.len() - 1;
        &self.sites[last]
    }

    pub(crate) fn remove(&mut self, id: ConstructionId) -> Option<Site> {
        let index = self.sites.iter().position(|site| site.id == id)?;
        Some(self.sites.remove(index))
    }

    /// Removes and returns every site whose time-to-live has elapsed at `now`.
    pub(crate) fn drain_expired(&mut self, now: Duration) -> Vec<Site> {
        let (active, expired): (Vec<Site>, Vec<Site>) =
            self.sites.drain(..).partition(|site| site.is_active(now));
        self.sites = active;
        expired
    }

    /// Forgets a cell that was overwritten explicitly so expiry leaves it alone.
    pub(crate) fn detach(&mut self, cell: CellCoord) {
        for site in &mut self.sites {
            site.blocked.retain(|(blocked, _)| *blocked != cell);
        }
    }

    pub(crate) fn snapshots(&self) -> Vec<ConstructionSnapshot> {
        self.sites
            .iter()
            .map(|site| ConstructionSnapshot {
                id: site.id,
                kind: site.kind,
                cells: site.cells(),
                spawned_at: site.spawned_at,
                expires_at: site.expires_at(),
            })
            .collect()
    }
}

/// Picks `count` orthogonally connected normal cells close to `near`.
///
/// Seeds are tried in breadth-first order outward from `near` up to
/// [`NEARBY_RADIUS`]; the first seed whose connected cluster of eligible cells
/// reaches `count` wins. Cells in `occupied` are never picked, and a request
/// that would leave the grid without a single walkable cell is refused.
pub(crate) fn select_cells(
    grid: &GridMap,
    near: CellCoord,
    count: usize,
    occupied: &BTreeSet<CellCoord>,
) -> Option<Vec<CellCoord>> {
    if count == 0 || grid.walkable_count() <= count {
        return None;
    }

    let eligible =
        |cell: CellCoord| grid.tile(cell) == Ok(TileKind::Normal) && !occupied.contains(&cell);

    let mut tried = BTreeSet::new();
    for seed in cells_by_distance(grid, near) {
        if !eligible(seed) || tried.contains(&seed) {
            continue;
        }
        let cluster = grow_cluster(grid, seed, count, &eligible);
        if cluster.len() == count {
            return Some(cluster);
        }
        tried.extend(cluster);
    }

    None
}

/// Picks up to `count` distinct normal cells from `candidates`, keeping their order.
///
/// Returns `None` when no candidate qualifies or when blocking the picks would
/// leave the grid without a walkable cell.
pub(crate) fn select_scattered(
    grid: &GridMap,
    candidates: &[CellCoord],
    count: usize,
    occupied: &BTreeSet<CellCoord>,
) -> Option<Vec<CellCoord>> {
    let mut picked = Vec::with_capacity(count);
    for cell in candidates {
        if picked.len() == count {
            break;
        }
        if grid.tile(*cell) == Ok(TileKind::Normal)
            && !occupied.contains(cell)
            && !picked.contains(cell)
        {
            picked.push(*cell);
        }
    }

    if picked.is_empty() || grid.walkable_count() <= picked.len() {
        None
    } else {
        Some(picked)
    }
}

fn cells_by_distance(grid: &GridMap, near: CellCoord) -> Vec<CellCoord> {
    let mut ordered = Vec::new();
    let mut visited = BTreeSet::from([near]);
    let mut queue = VecDeque::from([near]);

    while let Some(cell) = queue.pop_front() {
        ordered.push(cell);
        for direction in Direction::NAVIGATION_ORDER {
            let Some(next) = cell.step(direction) else {
                continue;
            };
            if grid.contains(next)
                && next.manhattan_distance(near) <= NEARBY_RADIUS
                && visited.insert(next)
            {
                queue.push_back(next);
            }
        }
    }

    ordered
}

fn grow_cluster<F>(grid: &GridMap, seed: CellCoord, count: usize, eligible: &F) -> Vec<CellCoord>
where
    F: Fn(CellCoord) -> bool,
{
    let mut cluster = vec![seed];
    let mut visited = BTreeSet::from([seed]);
    let mut queue = VecDeque::from([seed]);

    while let Some(cell) = queue.pop_front() {
        for direction in Direction::NAVIGATION_ORDER {
            if cluster.len() == count {
                return cluster;
            }
            let Some(next) = cell.step(direction) else {
                continue;
            };
            if grid.contains(next) && eligible(next) && visited.insert(next) {
                cluster.push(next);
                queue.push_back(next);
            }
        }
    }

    cluster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_connected_cells_starting_at_the_reference() {
        let grid = GridMap::new(5, 5).expect("small grid");
        let near = CellCoord::new(2, 2);
        let cells = select_cells(&grid, near, 3, &BTreeSet::new()).expect("room for a site");

        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0], near);
        for cell in &cells[1..] {
            assert!(cells
                .iter()
                .any(|other| Direction::between(*other, *cell).is_some()));
        }
    }

    #[test]
    fn occupied_and_special_cells_are_skipped() {
        let mut grid = GridMap::new(3, 1).expect("small grid");
        let _ = grid
            .set_tile(CellCoord::new(1, 0), TileKind::Ice)
            .expect("in bounds");
        let occupied = BTreeSet::from([CellCoord::new(0, 0)]);

        let cells = select_cells(&grid, CellCoord::new(0, 0), 1, &occupied);
        assert_eq!(cells, Some(vec![CellCoord::new(2, 0)]));
        assert_eq!(select_cells(&grid, CellCoord::new(0, 0), 2, &occupied), None);
    }

    #[test]
    fn refuses_to_block_every_walkable_cell() {
        let grid = GridMap::new(2, 1).expect("small grid");
        assert_eq!(select_cells(&grid, CellCoord::new(0, 0), 2, &BTreeSet::new()), None);
        assert!(select_cells(&grid, CellCoord::new(0, 0), 1, &BTreeSet::new()).is_some());
    }

    #[test]
    fn scattered_picks_skip_ineligible_and_repeated_candidates() {
        let mut grid = GridMap::new(4, 1).expect("small grid");
        let _ = grid
            .set_tile(CellCoord::new(1, 0), TileKind::Wall)
            .expect("in bounds");
        let occupied = BTreeSet::from([CellCoord::new(3, 0)]);
        let candidates = [
            CellCoord::new(1, 0),
            CellCoord::new(2, 0),
            CellCoord::new(2, 0),
            CellCoord::new(3, 0),
            CellCoord::new(0, 0),
        ];

        assert_eq!(
            select_scattered(&grid, &candidates, 1, &occupied),
            Some(vec![CellCoord::new(2, 0)])
        );
        // Taking both remaining walkway cells would still leave the actor's cell.
        assert_eq!(
            select_scattered(&grid, &candidates, 5, &occupied),
            Some(vec![CellCoord::new(2, 0), CellCoord::new(0, 0)])
        );
        assert_eq!(select_scattered(&grid, &candidates[..1], 2, &occupied), None);
    }

    #[test]
    fn sites_expire_once_their_ttl_has_elapsed() {
        let mut sites = ConstructionSites::default();
        let ttl = Duration::from_secs(45);
        let id = sites
            .open(
                SiteKind::Construction,
                vec![(CellCoord::new(0, 0), TileKind::Normal)],
                Duration::from_secs(10),
                ttl,
            )
            .id;

        assert!(sites.drain_expired(Duration::from_millis(54_999)).is_empty());
        assert_eq!(sites.snapshots()[0].expires_at, Duration::from_secs(55));
        let expired = sites.drain_expired(Duration::from_secs(55));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, id);
        assert!(sites.snapshots().is_empty());
    }

    #[test]
    fn detached_cells_are_not_restored() {
        let mut sites = ConstructionSites::default();
        let id = sites
            .open(
                SiteKind::Construction,
                vec![
                    (CellCoord::new(0, 0), TileKind::Normal),
                    (CellCoord::new(1, 0), TileKind::Normal),
                ],
                Duration::ZERO,
                Duration::from_secs(1),
            )
            .id;
        sites.detach(CellCoord::new(0, 0));

        let site = sites.remove(id).expect("site exists");
        assert_eq!(site.cells(), vec![CellCoord::new(1, 0)]);
        assert!(sites.remove(id).is_none());
    }
}
