#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! NPC behaviour driven by a small finite state machine.
//!
//! Every NPC idles, patrols a route of waypoints, and, depending on its kind,
//! chases the player or helps them by clearing construction. Each move asks
//! the search engine for a fresh A* path and hands it to the world, which
//! then plays back a single element.

use std::{collections::BTreeMap, time::Duration};

use campus_runner_core::{
    ActorId, ActorKind, ActorSnapshot, ActorView, CellCoord, Command, ConstructionId,
    ConstructionSnapshot, Event, NavigationGraph, NpcKind,
};
use campus_runner_system_search::astar;
use log::{debug, warn};

/// Reasons a patrol configuration may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// NPCs would never move.
    #[error("step delay must be greater than zero")]
    ZeroStepDelay,
    /// The chase multiplier is not a positive finite number.
    #[error("chase speed must be a positive finite factor (got {0})")]
    InvalidChaseSpeed(f32),
}

/// Timing and distance knobs for NPC behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Delay between two moves while patrolling or returning.
    pub step_delay: Duration,
    /// Factor applied to the move rate while chasing.
    pub chase_speed: f32,
    /// How long an idle NPC waits before it starts patrolling.
    pub idle_delay: Duration,
    /// How long an interaction keeps an NPC in place.
    pub interact_duration: Duration,
    /// Euclidean distance within which a guard notices the player.
    pub guard_detection: f32,
    /// Euclidean distance within which other NPCs notice the player.
    pub detection: f32,
    /// Euclidean distance at which the player counts as reached.
    pub reach: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(300),
            chase_speed: 1.5,
            idle_delay: Duration::from_secs(3),
            interact_duration: Duration::from_secs(2),
            guard_detection: 4.0,
            detection: 3.0,
            reach: 1.5,
        }
    }
}

impl Config {
    /// Checks the configuration for values that would stall the state machine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_delay.is_zero() {
            return Err(ConfigError::ZeroStepDelay);
        }
        if !self.chase_speed.is_finite() || self.chase_speed <= 0.0 {
            return Err(ConfigError::InvalidChaseSpeed(self.chase_speed));
        }
        Ok(())
    }

    fn detection_range(&self, kind: NpcKind) -> f32 {
        match kind {
            NpcKind::Guard => self.guard_detection,
            NpcKind::Student | NpcKind::Professor | NpcKind::LabAssistant => self.detection,
        }
    }

    fn chase_delay(&self) -> Duration {
        self.step_delay.div_f32(self.chase_speed)
    }
}

/// Behaviour an NPC is currently executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NpcState {
    /// Standing still until the idle delay elapses.
    Idle,
    /// Walking between waypoints.
    Patrol,
    /// Pursuing the player.
    Chase,
    /// Walking back to the spawn cell after losing the player.
    Return,
    /// Talking to the player.
    Interact,
}

#[derive(Clone, Debug)]
struct Brain {
    kind: NpcKind,
    home: CellCoord,
    state: NpcState,
    state_timer: Duration,
    move_timer: Duration,
    route: Vec<CellCoord>,
    waypoint: usize,
    engaged: bool,
}

impl Brain {
    fn new(kind: NpcKind, home: CellCoord) -> Self {
        Self {
            kind,
            home,
            state: NpcState::Idle,
            state_timer: Duration::ZERO,
            move_timer: Duration::ZERO,
            route: vec![home],
            waypoint: 0,
            engaged: false,
        }
    }

    fn enter(&mut self, state: NpcState) {
        self.state = state;
        self.state_timer = Duration::ZERO;
    }

    fn next_waypoint(&mut self, position: CellCoord) -> Option<CellCoord> {
        let target = *self.route.get(self.waypoint)?;
        if target != position {
            return Some(target);
        }
        self.waypoint = (self.waypoint + 1) % self.route.len();
        self.route.get(self.waypoint).copied()
    }
}

/// Pure system that steers every NPC on the campus.
#[derive(Debug)]
pub struct Patrol {
    config: Config,
    brains: BTreeMap<ActorId, Brain>,
}

impl Patrol {
    /// Creates a new patrol system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            brains: BTreeMap::new(),
        }
    }

    /// Current behaviour of the NPC, if it is known to the system.
    #[must_use]
    pub fn state(&self, actor: ActorId) -> Option<NpcState> {
        self.brains.get(&actor).map(|brain| brain.state)
    }

    /// Gives an NPC a cyclic list of waypoints and sets it patrolling.
    ///
    /// Returns `false` when the actor is not a known NPC or the route is empty.
    pub fn assign_route(&mut self, actor: ActorId, route: Vec<CellCoord>) -> bool {
        let Some(brain) = self.brains.get_mut(&actor) else {
            return false;
        };
        if route.is_empty() {
            return false;
        }
        brain.route = route;
        brain.waypoint = 0;
        brain.enter(NpcState::Patrol);
        true
    }

    /// Consumes world events and views, emitting movement and assistance commands.
    pub fn handle<G>(
        &mut self,
        events: &[Event],
        actors: &ActorView,
        graph: &G,
        sites: &[ConstructionSnapshot],
        out: &mut Vec<Command>,
    ) where
        G: NavigationGraph + ?Sized,
    {
        let mut elapsed = Duration::ZERO;
        for event in events {
            match event {
                Event::GridConfigured { .. } => self.brains.clear(),
                Event::ActorSpawned {
                    actor,
                    kind: ActorKind::Npc(kind),
                    cell,
                } => {
                    let _ = self.brains.insert(*actor, Brain::new(*kind, *cell));
                }
                Event::TimeAdvanced { dt } => elapsed = elapsed.saturating_add(*dt),
                _ => {}
            }
        }

        if elapsed.is_zero() {
            return;
        }

        let surroundings = Surroundings {
            config: self.config,
            player: actors.player().map(|snapshot| snapshot.cell),
            graph,
            sites,
        };
        for (id, brain) in &mut self.brains {
            let Some(snapshot) = actors.get(*id) else {
                continue;
            };
            brain.state_timer = brain.state_timer.saturating_add(elapsed);
            brain.move_timer = brain.move_timer.saturating_add(elapsed);
            surroundings.think(brain, snapshot, out);
        }
    }
}

/// Everything an NPC may look at while deciding what to do this tick.
struct Surroundings<'a, G: ?Sized> {
    config: Config,
    player: Option<CellCoord>,
    graph: &'a G,
    sites: &'a [ConstructionSnapshot],
}

impl<G> Surroundings<'_, G>
where
    G: NavigationGraph + ?Sized,
{
    fn think(&self, brain: &mut Brain, npc: &ActorSnapshot, out: &mut Vec<Command>) {
        let config = &self.config;
        let range = config.detection_range(brain.kind);
        let distance = self
            .player
            .map_or(f32::INFINITY, |cell| euclidean(cell, npc.cell));
        if distance >= config.reach {
            brain.engaged = false;
        }

        match brain.state {
            NpcState::Idle => {
                if brain.state_timer > config.idle_delay {
                    brain.enter(NpcState::Patrol);
                }
            }
            NpcState::Patrol => {
                if brain.kind == NpcKind::Guard && distance < range {
                    debug!("guard {} spotted the player", npc.id);
                    brain.enter(NpcState::Chase);
                } else if brain.kind == NpcKind::LabAssistant
                    && distance < config.reach
                    && !brain.engaged
                {
                    brain.engaged = true;
                    brain.enter(NpcState::Interact);
                    if let Some(site) = nearest_site(self.sites, self.player) {
                        debug!("lab assistant {} clears site {}", npc.id, site.get());
                        out.push(Command::ClearConstruction { site });
                    }
                } else if brain.move_timer >= config.step_delay {
                    brain.move_timer = Duration::ZERO;
                    if let Some(target) = brain.next_waypoint(npc.cell) {
                        self.step_toward(npc, target, out);
                    }
                }
            }
            NpcState::Chase => {
                if distance > range * 2.0 {
                    brain.enter(NpcState::Return);
                } else if distance < config.reach {
                    brain.enter(NpcState::Interact);
                } else if brain.move_timer >= config.chase_delay() {
                    brain.move_timer = Duration::ZERO;
                    if let Some(target) = self.player {
                        self.step_toward(npc, target, out);
                    }
                }
            }
            NpcState::Return => {
                if npc.cell == brain.home {
                    brain.enter(NpcState::Patrol);
                } else if brain.move_timer >= config.step_delay {
                    brain.move_timer = Duration::ZERO;
                    self.step_toward(npc, brain.home, out);
                }
            }
            NpcState::Interact => {
                if brain.state_timer > config.interact_duration {
                    brain.enter(NpcState::Patrol);
                }
            }
        }
    }

    /// Requests a fresh path toward `target` and advances one element along it.
    fn step_toward(&self, npc: &ActorSnapshot, target: CellCoord, out: &mut Vec<Command>) {
        if npc.cell == target {
            return;
        }
        match astar::find_path(self.graph, npc.cell, target) {
            Ok(path) if path.edge_count() > 0 => {
                out.push(Command::AssignPath {
                    actor: npc.id,
                    path,
                });
                out.push(Command::FollowPath { actor: npc.id });
            }
            Ok(_) => debug!("npc {} has no route to {target}", npc.id),
            Err(error) => warn!("npc {} cannot plan toward {target}: {error}", npc.id),
        }
    }
}

/// Site whose closest cell lies nearest to the player, ties going to the older site.
fn nearest_site(
    sites: &[ConstructionSnapshot],
    player: Option<CellCoord>,
) -> Option<ConstructionId> {
    let player = player?;
    sites
        .iter()
        .filter_map(|site| {
            site.cells
                .iter()
                .map(|cell| cell.manhattan_distance(player))
                .min()
                .map(|distance| (distance, site.id))
        })
        .min()
        .map(|(_, id)| id)
}

fn euclidean(a: CellCoord, b: CellCoord) -> f32 {
    let dx = a.column().abs_diff(b.column()) as f32;
    let dy = a.row().abs_diff(b.row()) as f32;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_runner_core::SiteKind;

    #[test]
    fn nearest_site_prefers_the_closest_cell() {
        let sites = vec![
            ConstructionSnapshot {
                id: ConstructionId::new(0),
                kind: SiteKind::Construction,
                cells: vec![CellCoord::new(9, 9)],
                spawned_at: Duration::ZERO,
                expires_at: Duration::from_secs(45),
            },
            ConstructionSnapshot {
                id: ConstructionId::new(1),
                kind: SiteKind::FireDrill,
                cells: vec![CellCoord::new(5, 5), CellCoord::new(2, 1)],
                spawned_at: Duration::ZERO,
                expires_at: Duration::from_secs(45),
            },
        ];
        assert_eq!(
            nearest_site(&sites, Some(CellCoord::new(1, 1))),
            Some(ConstructionId::new(1))
        );
        assert_eq!(nearest_site(&sites, None), None);
        assert_eq!(nearest_site(&[], Some(CellCoord::new(1, 1))), None);
    }

    #[test]
    fn waypoints_cycle_once_reached() {
        let mut brain = Brain::new(NpcKind::Student, CellCoord::new(0, 0));
        brain.route = vec![CellCoord::new(0, 0), CellCoord::new(3, 0)];
        assert_eq!(brain.next_waypoint(CellCoord::new(0, 0)), Some(CellCoord::new(3, 0)));
        assert_eq!(brain.next_waypoint(CellCoord::new(1, 0)), Some(CellCoord::new(3, 0)));
        assert_eq!(brain.next_waypoint(CellCoord::new(3, 0)), Some(CellCoord::new(0, 0)));
    }

    #[test]
    fn chase_moves_faster_than_patrol() {
        let config = Config::default();
        let delay = config.chase_delay();
        assert!(delay < config.step_delay);
        let expected = Duration::from_millis(200);
        let drift = delay.max(expected) - delay.min(expected);
        assert!(drift < Duration::from_micros(1));
        assert_eq!(config.validate(), Ok(()));
        let stalled = Config {
            chase_speed: 0.0,
            ..Config::default()
        };
        assert_eq!(stalled.validate(), Err(ConfigError::InvalidChaseSpeed(0.0)));
    }
}
