//! Headless game loop that walks the player to a landmark.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use campus_runner_core::{ActorId, ActorKind, CellCoord, Command, Event, NpcKind};
use campus_runner_system_obstacles::Obstacles;
use campus_runner_system_patrol::Patrol;
use campus_runner_system_search::Algorithm;
use campus_runner_world::{self as world, query, World};
use log::{debug, info};

use crate::{campus::CampusModel, config::Settings};

/// Counters collected while the simulation runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub(crate) arrived: bool,
    pub(crate) elapsed: Duration,
    pub(crate) steps: u32,
    pub(crate) replans: u32,
    pub(crate) blocked: u32,
    pub(crate) effects: u32,
    pub(crate) penalty: Duration,
    pub(crate) sites_started: u32,
    pub(crate) sites_ended: u32,
    pub(crate) showers: u32,
}

/// World, obstacle controller, and NPC brains driven by one fixed-step clock.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    obstacles: Obstacles,
    patrol: Patrol,
    algorithm: Algorithm,
    player: ActorId,
    goal: CellCoord,
    step_delay: Duration,
    move_timer: Duration,
    pending: Vec<Event>,
    outcome: Outcome,
}

impl Simulation {
    /// Lays out the campus, spawns the player at `start`, and populates the NPC roster.
    pub(crate) fn new(
        campus: &CampusModel,
        settings: Settings,
        algorithm: Algorithm,
        start: CellCoord,
        goal: CellCoord,
        step_delay: Duration,
    ) -> Result<Self> {
        if step_delay.is_zero() {
            bail!("player step delay must be greater than zero");
        }
        let world = World::with_rules(settings.rules).context("invalid rules")?;
        let mut simulation = Self {
            world,
            obstacles: Obstacles::new(settings.obstacles),
            patrol: Patrol::new(settings.patrol),
            algorithm,
            player: ActorId::new(0),
            goal,
            step_delay,
            move_timer: Duration::ZERO,
            pending: Vec::new(),
            outcome: Outcome::default(),
        };

        for command in campus.commands() {
            let _ = simulation.apply(command)?;
        }
        simulation.player = simulation
            .spawn(ActorKind::Player, start)?
            .with_context(|| format!("player cannot start on {start}"))?;

        for (kind, home, route) in roster(campus, start) {
            match simulation.spawn(ActorKind::Npc(kind), home)? {
                Some(actor) => {
                    simulation.think();
                    let _ = simulation.patrol.assign_route(actor, route);
                }
                None => debug!("skipping {kind:?} on blocked cell {home}"),
            }
        }
        simulation.think();
        Ok(simulation)
    }

    /// Advances the campus in `tick` steps until the player arrives or `limit` elapses.
    pub(crate) fn run(mut self, limit: Duration, tick: Duration) -> Result<(Outcome, World)> {
        if tick.is_zero() {
            bail!("tick length must be greater than zero");
        }
        while query::elapsed(&self.world) < limit {
            if query::actor_cell(&self.world, self.player)? == self.goal {
                self.outcome.arrived = true;
                break;
            }
            let _ = self.apply(Command::Tick { dt: tick })?;
            self.drive_player(tick)?;
            self.think();
        }
        if query::actor_cell(&self.world, self.player)? == self.goal {
            self.outcome.arrived = true;
        }

        self.outcome.penalty = query::actor_view(&self.world)
            .get(self.player)
            .map(|snapshot| snapshot.penalty)
            .unwrap_or_default();
        self.outcome.elapsed = query::elapsed(&self.world);
        info!(
            "simulation finished after {:?}: arrived={}",
            self.outcome.elapsed, self.outcome.arrived
        );
        Ok((self.outcome, self.world))
    }

    fn drive_player(&mut self, dt: Duration) -> Result<()> {
        self.move_timer = self.move_timer.saturating_add(dt);
        let multiplier = query::speed_multiplier(&self.world, self.player)?;
        if self.move_timer < self.step_delay.div_f32(multiplier) {
            return Ok(());
        }
        self.move_timer = Duration::ZERO;

        let view = query::actor_view(&self.world);
        let Some(player) = view.get(self.player) else {
            return Ok(());
        };
        if player.cell == self.goal {
            return Ok(());
        }
        if player.path_remaining == 0 {
            let report = query::plan(&self.world, self.player, self.algorithm, self.goal)?;
            if report.path.is_empty() {
                debug!("no route from {} to {} yet", player.cell, self.goal);
                return Ok(());
            }
            self.outcome.replans += 1;
            let _ = self.apply(Command::AssignPath {
                actor: self.player,
                path: report.path,
            })?;
        }
        let _ = self.apply(Command::FollowPath { actor: self.player })?;
        Ok(())
    }

    fn think(&mut self) {
        let events = std::mem::take(&mut self.pending);
        let actors = query::actor_view(&self.world);
        let sites = query::construction_sites(&self.world);
        let player = actors.player().map(|snapshot| snapshot.cell);

        let mut commands = Vec::new();
        self.obstacles.handle(
            &events,
            player,
            query::dimensions(&self.world),
            &mut commands,
        );
        self.patrol.handle(
            &events,
            &actors,
            &query::navigation(&self.world),
            &sites,
            &mut commands,
        );

        for command in commands {
            if let Err(error) = self.apply(command) {
                debug!("dropping system command: {error}");
            }
        }
    }

    fn spawn(&mut self, kind: ActorKind, cell: CellCoord) -> Result<Option<ActorId>> {
        let events = self.apply(Command::SpawnActor { kind, cell })?;
        Ok(events.iter().find_map(|event| match event {
            Event::ActorSpawned { actor, .. } => Some(*actor),
            _ => None,
        }))
    }

    fn apply(&mut self, command: Command) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events)?;
        for event in &events {
            self.record(event);
        }
        self.pending.extend(events.iter().cloned());
        Ok(events)
    }

    fn record(&mut self, event: &Event) {
        match event {
            Event::ActorMoved { actor, .. } if *actor == self.player => self.outcome.steps += 1,
            Event::StepBlocked { .. } | Event::PathInvalidated { .. } => {
                self.outcome.blocked += 1;
            }
            Event::TileEffectApplied { actor, effect, .. } if *actor == self.player => {
                info!("player triggered {effect:?}");
                self.outcome.effects += 1;
            }
            Event::ConstructionStarted { .. } => self.outcome.sites_started += 1,
            Event::ConstructionEnded { .. } => self.outcome.sites_ended += 1,
            Event::RainStarted { .. } => self.outcome.showers += 1,
            _ => {}
        }
    }
}

/// NPC roster derived from the start cell followed by the landmarks in letter order.
///
/// Students shuttle between consecutive points, the guard sweeps from the first
/// point to the last, the professor holds the fourth point, and the lab
/// assistant walks between the last two.
fn roster(campus: &CampusModel, start: CellCoord) -> Vec<(NpcKind, CellCoord, Vec<CellCoord>)> {
    let points: Vec<CellCoord> = std::iter::once(start)
        .chain(campus.landmarks().map(|(_, cell)| cell))
        .collect();
    let mut roster = Vec::new();
    if points.len() < 2 {
        return roster;
    }

    for pair in points.windows(2).take(3) {
        roster.push((NpcKind::Student, pair[0], vec![pair[0], pair[1]]));
    }
    let last = points[points.len() - 1];
    roster.push((NpcKind::Guard, points[points.len() / 2], vec![points[0], last]));
    if let Some(post) = points.get(3) {
        roster.push((NpcKind::Professor, *post, vec![*post]));
    }
    let penultimate = points[points.len() - 2];
    roster.push((NpcKind::LabAssistant, penultimate, vec![penultimate, last]));
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_runner_system_obstacles as obstacles;

    fn settings(seed: u64) -> Settings {
        let mut settings = Settings::load(None).expect("defaults");
        settings.reseed(seed).expect("reseed");
        settings
    }

    #[test]
    fn roster_follows_the_landmark_order() {
        let campus = CampusModel::parse("S.A.B.D").expect("parses");
        let roster = roster(&campus, CellCoord::new(0, 0));
        let kinds: Vec<NpcKind> = roster.iter().map(|(kind, _, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![
                NpcKind::Student,
                NpcKind::Student,
                NpcKind::Student,
                NpcKind::Guard,
                NpcKind::Professor,
                NpcKind::LabAssistant,
            ]
        );
        assert_eq!(roster[3].1, CellCoord::new(4, 0));
        assert_eq!(roster[3].2, vec![CellCoord::new(0, 0), CellCoord::new(6, 0)]);
    }

    #[test]
    fn player_reaches_the_library() {
        let campus = CampusModel::builtin().expect("built-in");
        let start = campus.start().expect("start");
        let goal = campus.resolve("K").expect("library");
        let simulation = Simulation::new(
            &campus,
            settings(3),
            Algorithm::AStar,
            start,
            goal,
            Duration::from_millis(200),
        )
        .expect("simulation starts");

        let (outcome, world) = simulation
            .run(Duration::from_secs(300), Duration::from_millis(100))
            .expect("simulation runs");
        assert!(outcome.arrived, "{outcome:?}");
        assert!(outcome.steps >= 11);
        assert_eq!(query::actor_view(&world).player().map(|p| p.cell), Some(goal));
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let run = |seed: u64| {
            let campus = CampusModel::builtin().expect("built-in");
            let start = campus.start().expect("start");
            let goal = campus.resolve("E").expect("landmark");
            Simulation::new(
                &campus,
                settings(seed),
                Algorithm::Bfs,
                start,
                goal,
                Duration::from_millis(500),
            )
            .expect("simulation starts")
            .run(Duration::from_secs(120), Duration::from_millis(250))
            .expect("simulation runs")
            .0
        };
        assert_eq!(run(8), run(8));
    }

    #[test]
    fn rejects_degenerate_timing() {
        let campus = CampusModel::parse("S.A").expect("parses");
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(2, 0);
        assert!(Simulation::new(
            &campus,
            settings(1),
            Algorithm::Bfs,
            start,
            goal,
            Duration::ZERO
        )
        .is_err());
        let simulation = Simulation::new(
            &campus,
            settings(1),
            Algorithm::Bfs,
            start,
            goal,
            Duration::from_millis(100),
        )
        .expect("simulation starts");
        assert!(simulation.run(Duration::from_secs(1), Duration::ZERO).is_err());
    }

    #[test]
    fn rain_only_mixes_are_counted_as_showers() {
        let campus = CampusModel::parse("S#A").expect("parses");
        let mut settings = settings(5);
        settings.obstacles = settings
            .obstacles
            .with_mix(obstacles::EventMix {
                construction: 0,
                rain: 1,
                fire_drill: 0,
            })
            .expect("rain only");
        let simulation = Simulation::new(
            &campus,
            settings,
            Algorithm::Bfs,
            CellCoord::new(0, 0),
            CellCoord::new(2, 0),
            Duration::from_millis(500),
        )
        .expect("simulation starts");

        let (outcome, _) = simulation
            .run(Duration::from_secs(200), Duration::from_secs(1))
            .expect("simulation runs");
        assert!(!outcome.arrived);
        assert!(outcome.showers >= 3, "{outcome:?}");
        assert_eq!(outcome.sites_started, 0);
        assert_eq!(outcome.replans, 0);
    }
}
