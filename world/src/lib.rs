#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Campus Runner.
//!
//! The world owns the tile grid, the actors walking on it, the portal pairs,
//! the active construction sites and fire drills, the weather, and the
//! simulation clock. Every mutation
//! goes through [`apply`], which reports what happened as [`Event`] values;
//! everything else is read through the [`query`] module.

mod actor;
mod construction;
mod grid;
mod history;
mod navigation;

use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    time::Duration,
};

use campus_runner_core::{
    ActorId, ActorKind, BlockReason, CellCoord, Command, ConstructionEnd, ConstructionId,
    Direction, Event, GridError, Path, Rules, RulesError, SiteKind, TileEffect, TileKind,
};
use log::{debug, info, warn};

use crate::{actor::Actor, construction::ConstructionSites};

pub use grid::GridMap;
pub use history::{UndoEntry, UndoHistory};
pub use navigation::NavigationView;

/// Represents the authoritative Campus Runner world state.
#[derive(Debug)]
pub struct World {
    grid: GridMap,
    rules: Rules,
    portals: BTreeMap<CellCoord, CellCoord>,
    actors: Vec<Actor>,
    next_actor: u32,
    sites: ConstructionSites,
    rain_until: Option<Duration>,
    clock: Duration,
}

impl World {
    /// Creates an all-normal campus of the default size governed by the default rules.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rules(Rules::default())
    }

    /// Creates an all-normal campus of the default size governed by custom rules.
    pub fn with_rules(rules: Rules) -> Result<Self, RulesError> {
        rules.validate()?;
        Ok(Self::from_rules(rules))
    }

    fn from_rules(rules: Rules) -> Self {
        Self {
            grid: GridMap::default(),
            rules,
            portals: BTreeMap::new(),
            actors: Vec::new(),
            next_actor: 0,
            sites: ConstructionSites::default(),
            rain_until: None,
            clock: Duration::ZERO,
        }
    }

    /// Replaces the game with a fresh grid; an oversized request leaves the world untouched.
    fn reset(&mut self, columns: u32, rows: u32) -> Result<(), GridError> {
        self.grid = GridMap::new(columns, rows)?;
        self.portals.clear();
        self.actors.clear();
        self.next_actor = 0;
        self.sites = ConstructionSites::default();
        self.rain_until = None;
        self.clock = Duration::ZERO;
        Ok(())
    }

    fn rain_multiplier(&self) -> u32 {
        if self.rain_until.is_some() {
            self.rules.rain_multiplier
        } else {
            1
        }
    }

    fn actor_index(&self, actor: ActorId) -> Result<usize, GridError> {
        self.actors
            .iter()
            .position(|candidate| candidate.id == actor)
            .ok_or(GridError::UnknownActor { actor })
    }

    fn set_tile(
        &mut self,
        cell: CellCoord,
        kind: TileKind,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let previous = self.grid.set_tile(cell, kind)?;
        self.sites.detach(cell);
        if previous == TileKind::Portal && kind != TileKind::Portal {
            self.unlink_portal(cell);
        }
        if previous != kind {
            out_events.push(Event::TileChanged {
                cell,
                from: previous,
                to: kind,
            });
        }
        Ok(())
    }

    fn unlink_portal(&mut self, cell: CellCoord) {
        if let Some(partner) = self.portals.remove(&cell) {
            let _ = self.portals.remove(&partner);
        }
    }

    fn link_portals(
        &mut self,
        entrance: CellCoord,
        exit: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        self.grid.check(entrance)?;
        self.grid.check(exit)?;
        if entrance == exit {
            warn!("ignoring request to link portal {entrance} to itself");
            return Ok(());
        }

        for cell in [entrance, exit] {
            self.unlink_portal(cell);
            self.set_tile(cell, TileKind::Portal, out_events)?;
        }
        let _ = self.portals.insert(entrance, exit);
        let _ = self.portals.insert(exit, entrance);
        out_events.push(Event::PortalsLinked { entrance, exit });
        Ok(())
    }

    fn spawn_actor(
        &mut self,
        kind: ActorKind,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let tile = self.grid.tile(cell)?;
        if !tile.is_walkable() {
            debug!("refusing to spawn {kind:?} on {tile:?} at {cell}");
            out_events.push(Event::SpawnRejected {
                cell,
                reason: BlockReason::Terrain { kind: tile },
            });
            return Ok(());
        }

        let id = ActorId::new(self.next_actor);
        self.next_actor = self.next_actor.saturating_add(1);
        self.actors
            .push(Actor::new(id, kind, cell, self.rules.undo_capacity));
        out_events.push(Event::ActorSpawned {
            actor: id,
            kind,
            cell,
        });
        Ok(())
    }

    /// Opens a locked gate at `cell` when the actor carries a key.
    fn unlock_gate(
        &mut self,
        index: usize,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let actor = self.actors[index].id;
        if !self.actors[index].has_key || self.grid.tile(cell)? != TileKind::LockedGate {
            return Ok(());
        }
        self.set_tile(cell, TileKind::Normal, out_events)?;
        info!("actor {actor} unlocked the gate at {cell}");
        out_events.push(Event::TileEffectApplied {
            actor,
            cell,
            effect: TileEffect::GateUnlocked,
        });
        Ok(())
    }

    fn step_actor(
        &mut self,
        actor: ActorId,
        direction: Direction,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let index = self.actor_index(actor)?;
        let from = self.actors[index].cell;

        let Some(destination) = from
            .step(direction)
            .filter(|cell| self.grid.contains(*cell))
        else {
            out_events.push(Event::StepBlocked {
                actor,
                direction,
                reason: BlockReason::Edge,
            });
            return Ok(());
        };

        self.unlock_gate(index, destination, out_events)?;
        let kind = self.grid.tile(destination)?;
        if !kind.is_walkable() {
            out_events.push(Event::StepBlocked {
                actor,
                direction,
                reason: BlockReason::Terrain { kind },
            });
            return Ok(());
        }

        let state = &mut self.actors[index];
        state.history.push(UndoEntry::new(from));
        if state.clear_path() {
            out_events.push(Event::PathInvalidated {
                actor,
                blocked: None,
            });
        }
        let _ = self.arrive(index, direction, destination, out_events);
        Ok(())
    }

    /// Moves an actor onto `landed`, resolves tile effects, and returns where it settled.
    fn arrive(
        &mut self,
        index: usize,
        direction: Direction,
        landed: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> CellCoord {
        let state = &mut self.actors[index];
        let effects = settle(
            &self.grid,
            &self.portals,
            &self.rules,
            state,
            direction,
            landed,
        );
        let from = state.cell;
        let settled = effects.settled;
        state.cell = settled;

        out_events.push(Event::ActorMoved {
            actor: state.id,
            from,
            to: settled,
        });
        for (cell, effect) in effects.applied {
            debug!("actor {} hit {effect:?} at {cell}", state.id);
            out_events.push(Event::TileEffectApplied {
                actor: state.id,
                cell,
                effect,
            });
        }
        settled
    }

    /// Restores the latest recorded cell, keeping the entry while that cell is blocked.
    fn undo(&mut self, actor: ActorId, out_events: &mut Vec<Event>) -> Result<(), GridError> {
        let index = self.actor_index(actor)?;
        let Some(cell) = self.actors[index].history.peek().map(UndoEntry::cell) else {
            out_events.push(Event::UndoUnavailable { actor });
            return Ok(());
        };

        let kind = self.grid.tile(cell)?;
        if !kind.is_walkable() {
            debug!("actor {actor} cannot undo onto {kind:?} at {cell}");
            out_events.push(Event::UndoBlocked {
                actor,
                cell,
                reason: BlockReason::Terrain { kind },
            });
            return Ok(());
        }

        let state = &mut self.actors[index];
        let _ = state.history.pop();
        let from = state.cell;
        state.cell = cell;
        out_events.push(Event::ActorRestored {
            actor,
            from,
            to: cell,
        });
        if state.clear_path() {
            out_events.push(Event::PathInvalidated {
                actor,
                blocked: None,
            });
        }
        Ok(())
    }

    fn assign_path(
        &mut self,
        actor: ActorId,
        path: Path,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let index = self.actor_index(actor)?;
        for cell in path.cells() {
            self.grid.check(*cell)?;
        }

        let state = &mut self.actors[index];
        if path.is_empty() {
            let _ = state.clear_path();
            out_events.push(Event::PathInvalidated {
                actor,
                blocked: None,
            });
            return Ok(());
        }

        let mut cells: VecDeque<CellCoord> = path.into_cells().into();
        if cells.front() == Some(&state.cell) {
            let _ = cells.pop_front();
        }

        let joins_actor = cells
            .front()
            .map_or(true, |first| Direction::between(state.cell, *first).is_some());
        let contiguous = cells
            .iter()
            .zip(cells.iter().skip(1))
            .all(|(from, to)| Direction::between(*from, *to).is_some());
        if !joins_actor || !contiguous {
            warn!("actor {actor} was handed a path that does not start beside it");
            let _ = state.clear_path();
            out_events.push(Event::PathInvalidated {
                actor,
                blocked: None,
            });
            return Ok(());
        }

        match cells.back().copied() {
            Some(goal) => {
                let steps = cells.len();
                state.path = cells;
                out_events.push(Event::PathAssigned { actor, goal, steps });
            }
            None => {
                let _ = state.clear_path();
                out_events.push(Event::PathCompleted { actor });
            }
        }
        Ok(())
    }

    fn follow_path(
        &mut self,
        actor: ActorId,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let index = self.actor_index(actor)?;
        let state = &self.actors[index];
        let current = state.cell;
        let Some(next) = state.path.front().copied() else {
            return Ok(());
        };

        let Some(direction) = Direction::between(current, next) else {
            let _ = self.actors[index].clear_path();
            out_events.push(Event::PathInvalidated {
                actor,
                blocked: None,
            });
            return Ok(());
        };

        self.unlock_gate(index, next, out_events)?;
        if !self.grid.is_walkable(next) {
            debug!("actor {actor} found {next} blocked while following its path");
            let _ = self.actors[index].clear_path();
            out_events.push(Event::PathInvalidated {
                actor,
                blocked: Some(next),
            });
            return Ok(());
        }

        let _ = self.actors[index].path.pop_front();
        let settled = self.arrive(index, direction, next, out_events);

        let state = &mut self.actors[index];
        if state.path.is_empty() {
            out_events.push(Event::PathCompleted { actor });
        } else if settled != next && state.clear_path() {
            out_events.push(Event::PathInvalidated {
                actor,
                blocked: None,
            });
        }
        Ok(())
    }

    fn spawn_construction(
        &mut self,
        near: CellCoord,
        count: usize,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        self.grid.check(near)?;
        let occupied: BTreeSet<CellCoord> = self.actors.iter().map(|actor| actor.cell).collect();
        let Some(cells) = construction::select_cells(&self.grid, near, count, &occupied) else {
            debug!("no room for {count} construction cells near {near}");
            out_events.push(Event::ConstructionSkipped { near, count });
            return Ok(());
        };

        let ttl = self.rules.construction_ttl;
        self.open_site(SiteKind::Construction, cells, ttl, out_events)
    }

    fn spawn_fire_drill(
        &mut self,
        candidates: &[CellCoord],
        count: usize,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        for cell in candidates {
            self.grid.check(*cell)?;
        }
        let occupied: BTreeSet<CellCoord> = self.actors.iter().map(|actor| actor.cell).collect();
        let picked = construction::select_scattered(&self.grid, candidates, count, &occupied);
        let Some(cells) = picked else {
            debug!("no room for a fire drill among {} candidates", candidates.len());
            out_events.push(Event::FireDrillSkipped { count });
            return Ok(());
        };

        let ttl = self.rules.fire_drill_ttl;
        self.open_site(SiteKind::FireDrill, cells, ttl, out_events)
    }

    /// Blocks `cells` and registers them as one site that lasts for `ttl`.
    fn open_site(
        &mut self,
        kind: SiteKind,
        cells: Vec<CellCoord>,
        ttl: Duration,
        out_events: &mut Vec<Event>,
    ) -> Result<(), GridError> {
        let mut blocked = Vec::with_capacity(cells.len());
        for cell in cells {
            let previous = self.grid.set_tile(cell, TileKind::Construction)?;
            out_events.push(Event::TileChanged {
                cell,
                from: previous,
                to: TileKind::Construction,
            });
            blocked.push((cell, previous));
        }

        let site = self.sites.open(kind, blocked, self.clock, ttl);
        info!(
            "{kind:?} site {} blocked {} cells",
            site.id.get(),
            site.blocked.len()
        );
        out_events.push(Event::ConstructionStarted {
            site: site.id,
            kind,
            cells: site.cells(),
            expires_at: site.expires_at(),
        });
        Ok(())
    }

    fn clear_construction(&mut self, site: ConstructionId, out_events: &mut Vec<Event>) {
        match self.sites.remove(site) {
            Some(removed) => {
                info!("construction site {} cleared", site.get());
                self.close_site(removed, ConstructionEnd::Cleared, out_events);
            }
            None => debug!("construction site {} is not active", site.get()),
        }
    }

    fn close_site(
        &mut self,
        site: construction::Site,
        reason: ConstructionEnd,
        out_events: &mut Vec<Event>,
    ) {
        let cells = site.cells();
        for (cell, prior) in site.blocked {
            if self.grid.tile(cell) != Ok(TileKind::Construction) {
                continue;
            }
            if let Ok(previous) = self.grid.set_tile(cell, prior) {
                out_events.push(Event::TileChanged {
                    cell,
                    from: previous,
                    to: prior,
                });
            }
        }
        out_events.push(Event::ConstructionEnded {
            site: site.id,
            cells,
            reason,
        });
    }

    fn start_rain(&mut self, out_events: &mut Vec<Event>) {
        let ends_at = self.clock.saturating_add(self.rules.rain_duration);
        if self.rain_until.replace(ends_at).is_none() {
            info!("rain started; movement costs x{}", self.rules.rain_multiplier);
        }
        out_events.push(Event::RainStarted {
            multiplier: self.rules.rain_multiplier,
            ends_at,
        });
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        for actor in &mut self.actors {
            actor.booster_remaining = actor.booster_remaining.saturating_sub(dt);
        }

        for site in self.sites.drain_expired(self.clock) {
            info!("construction site {} expired", site.id.get());
            self.close_site(site, ConstructionEnd::Expired, out_events);
        }

        if self.rain_until.is_some_and(|ends_at| self.clock >= ends_at) {
            self.rain_until = None;
            info!("rain stopped");
            out_events.push(Event::RainStopped);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

struct Settlement {
    settled: CellCoord,
    applied: Vec<(CellCoord, TileEffect)>,
}

/// Resolves every special tile the actor lands on after entering `landed`.
///
/// Ice keeps the actor moving in `direction` until a non-ice cell or an
/// obstacle stops it. The tile it stops on then acts exactly once: portals
/// relocate without chaining, traps charge a penalty the first time each
/// trap is entered, boosters restart the boost timer, and keys are picked up.
fn settle(
    grid: &GridMap,
    portals: &BTreeMap<CellCoord, CellCoord>,
    rules: &Rules,
    actor: &mut Actor,
    direction: Direction,
    landed: CellCoord,
) -> Settlement {
    let mut applied = Vec::new();
    let mut cell = landed;
    let mut slid = 0_u32;

    while grid.tile(cell) == Ok(TileKind::Ice)
        && rules.ice_slide_limit.map_or(true, |limit| slid < limit)
    {
        let Some(next) = cell.step(direction).filter(|next| grid.is_walkable(*next)) else {
            break;
        };
        cell = next;
        slid += 1;
    }
    if slid > 0 {
        applied.push((landed, TileEffect::Slid { distance: slid }));
    }

    match grid.tile(cell).unwrap_or(TileKind::Normal) {
        TileKind::Portal => {
            if let Some(partner) = portals.get(&cell).copied() {
                if grid.is_walkable(partner) {
                    applied.push((cell, TileEffect::Teleported { from: cell }));
                    cell = partner;
                }
            }
        }
        TileKind::Trap => {
            if actor.triggered_traps.insert(cell) {
                actor.penalty = actor.penalty.saturating_add(rules.trap_penalty);
                applied.push((
                    cell,
                    TileEffect::TrapTriggered {
                        penalty: rules.trap_penalty,
                    },
                ));
            }
        }
        TileKind::Booster => {
            actor.booster_remaining = rules.booster_duration;
            applied.push((
                cell,
                TileEffect::Boosted {
                    duration: rules.booster_duration,
                },
            ));
        }
        TileKind::Key => {
            if !actor.has_key {
                actor.has_key = true;
                applied.push((cell, TileEffect::KeyCollected));
            }
        }
        TileKind::Normal
        | TileKind::Ice
        | TileKind::Grass
        | TileKind::Water
        | TileKind::Wall
        | TileKind::Construction
        | TileKind::LockedGate => {}
    }

    Settlement {
        settled: cell,
        applied,
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Blocked steps, refused spawns, and skipped construction requests are
/// reported as events. Only programming errors, such as coordinates outside
/// the grid, oversized grids, or actors that were never spawned, surface as
/// [`GridError`].
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), GridError> {
    match command {
        Command::ConfigureGrid { columns, rows } => {
            world.reset(columns, rows)?;
            info!("configured a {columns}x{rows} campus grid");
            out_events.push(Event::GridConfigured { columns, rows });
        }
        Command::SetTile { cell, kind } => world.set_tile(cell, kind, out_events)?,
        Command::LinkPortals { entrance, exit } => world.link_portals(entrance, exit, out_events)?,
        Command::SpawnActor { kind, cell } => world.spawn_actor(kind, cell, out_events)?,
        Command::StepActor { actor, direction } => {
            world.step_actor(actor, direction, out_events)?;
        }
        Command::Undo { actor } => world.undo(actor, out_events)?,
        Command::AssignPath { actor, path } => world.assign_path(actor, path, out_events)?,
        Command::FollowPath { actor } => world.follow_path(actor, out_events)?,
        Command::SpawnConstruction { near, count } => {
            world.spawn_construction(near, count, out_events)?;
        }
        Command::SpawnFireDrill { candidates, count } => {
            world.spawn_fire_drill(&candidates, count, out_events)?;
        }
        Command::StartRain => world.start_rain(out_events),
        Command::ClearConstruction { site } => world.clear_construction(site, out_events),
        Command::Tick { dt } => world.tick(dt, out_events),
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use campus_runner_core::{
        ActorId, ActorView, CellCoord, ConstructionSnapshot, GridError, Path, Rules, TileKind,
    };
    use campus_runner_system_search::{astar, bfs, Algorithm, SearchReport};

    use super::{GridMap, NavigationView, World};

    /// Provides read-only access to the tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &GridMap {
        &world.grid
    }

    /// Grid dimensions as `(columns, rows)`.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Tile kind stored at the cell.
    pub fn tile(world: &World, cell: CellCoord) -> Result<TileKind, GridError> {
        world.grid.tile(cell)
    }

    /// Reports whether an actor may currently occupy the cell.
    #[must_use]
    pub fn is_walkable(world: &World, cell: CellCoord) -> bool {
        world.grid.is_walkable(cell)
    }

    /// Live navigation graph over the current grid, priced by the active rules and weather.
    #[must_use]
    pub fn navigation(world: &World) -> NavigationView<'_> {
        NavigationView::new(&world.grid, &world.rules.weights)
            .with_rain(world.rain_multiplier())
    }

    /// Navigation graph as the actor sees it; locked gates open when it carries a key.
    pub fn navigation_for(world: &World, actor: ActorId) -> Result<NavigationView<'_>, GridError> {
        let index = world.actor_index(actor)?;
        Ok(navigation(world).with_key(world.actors[index].has_key))
    }

    /// Fewest-steps path between two cells on the current grid.
    pub fn find_path_bfs(
        world: &World,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<Path, GridError> {
        bfs::find_path(&navigation(world), start, goal)
    }

    /// Cheapest path between two cells on the current grid.
    pub fn find_path_astar(
        world: &World,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<Path, GridError> {
        astar::find_path(&navigation(world), start, goal)
    }

    /// Runs the chosen search and reports how much of the grid it examined.
    pub fn search(
        world: &World,
        algorithm: Algorithm,
        start: CellCoord,
        goal: CellCoord,
    ) -> Result<SearchReport, GridError> {
        algorithm.run(&navigation(world), start, goal)
    }

    /// Runs the chosen search from the actor's cell to `goal` through the actor's own view.
    pub fn plan(
        world: &World,
        actor: ActorId,
        algorithm: Algorithm,
        goal: CellCoord,
    ) -> Result<SearchReport, GridError> {
        let start = actor_cell(world, actor)?;
        algorithm.run(&navigation_for(world, actor)?, start, goal)
    }

    /// Total cost of walking the path under the active tile weights.
    #[must_use]
    pub fn path_cost(world: &World, path: &Path) -> Option<u64> {
        let view = navigation(world);
        path.cost_with(|cell| view.weight(cell))
    }

    /// Captures a read-only view of the actors on the campus.
    #[must_use]
    pub fn actor_view(world: &World) -> ActorView {
        ActorView::from_snapshots(world.actors.iter().map(|actor| actor.snapshot()).collect())
    }

    /// Cell currently occupied by the actor.
    pub fn actor_cell(world: &World, actor: ActorId) -> Result<CellCoord, GridError> {
        let index = world.actor_index(actor)?;
        Ok(world.actors[index].cell)
    }

    /// Speed multiplier currently granted to the actor by boosters.
    pub fn speed_multiplier(world: &World, actor: ActorId) -> Result<f32, GridError> {
        let index = world.actor_index(actor)?;
        if world.actors[index].is_boosted() {
            Ok(world.rules.booster_multiplier)
        } else {
            Ok(1.0)
        }
    }

    /// Snapshots of every active construction site in identifier order.
    #[must_use]
    pub fn construction_sites(world: &World) -> Vec<ConstructionSnapshot> {
        world.sites.snapshots()
    }

    /// Portal cell paired with the provided one.
    #[must_use]
    pub fn portal_partner(world: &World, cell: CellCoord) -> Option<CellCoord> {
        world.portals.get(&cell).copied()
    }

    /// Factor currently applied to every movement cost; one when it is dry.
    #[must_use]
    pub fn rain_multiplier(world: &World) -> u32 {
        world.rain_multiplier()
    }

    /// Simulation time elapsed since the grid was configured.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.clock
    }

    /// Rules governing the world.
    #[must_use]
    pub fn rules(world: &World) -> &Rules {
        &world.rules
    }
}
