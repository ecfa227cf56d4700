#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded obstacle controller that schedules campus events.
//!
//! Every interval the controller picks one event: a construction site near
//! the player, a shower that raises movement costs, or a fire drill that
//! closes cells scattered over the whole campus.

use std::time::Duration;

use campus_runner_core::{CellCoord, Command, Event};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DEFAULT_INTERVAL_MIN: Duration = Duration::from_secs(30);
const DEFAULT_INTERVAL_MAX: Duration = Duration::from_secs(60);
const DEFAULT_CELLS_MIN: usize = 2;
const DEFAULT_CELLS_MAX: usize = 4;
const DEFAULT_SCATTER: u32 = 3;
const DEFAULT_FIRE_DRILL_CELLS: usize = 5;
/// Candidate cells drawn per requested fire drill cell, so walls and actors can be passed over.
const FIRE_DRILL_CANDIDATES_PER_CELL: usize = 4;
const DEFAULT_SEED: u64 = 0x5eed_c0de_2024_0001;

/// Reasons an obstacle configuration may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The spawn interval range is empty or starts at zero.
    #[error("spawn interval must satisfy 0 < min <= max (got {min:?}..={max:?})")]
    InvalidInterval {
        /// Requested lower bound.
        min: Duration,
        /// Requested upper bound.
        max: Duration,
    },
    /// The site size range is empty or starts at zero.
    #[error("site size must satisfy 1 <= min <= max (got {min}..={max})")]
    InvalidCellCount {
        /// Requested lower bound.
        min: usize,
        /// Requested upper bound.
        max: usize,
    },
    /// Every event weight is zero, so nothing could ever be scheduled.
    #[error("at least one event kind needs a non-zero weight")]
    EmptyMix,
    /// A fire drill was configured to close no cells.
    #[error("a fire drill must close at least one cell")]
    EmptyFireDrill,
}

/// Relative odds of each event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventMix {
    /// Weight of construction sites near the player.
    pub construction: u32,
    /// Weight of showers.
    pub rain: u32,
    /// Weight of fire drills.
    pub fire_drill: u32,
}

impl Default for EventMix {
    fn default() -> Self {
        Self {
            construction: 1,
            rain: 1,
            fire_drill: 1,
        }
    }
}

impl EventMix {
    /// Schedules construction sites and nothing else.
    #[must_use]
    pub const fn construction_only() -> Self {
        Self {
            construction: 1,
            rain: 0,
            fire_drill: 0,
        }
    }

    fn total(&self) -> u64 {
        u64::from(self.construction) + u64::from(self.rain) + u64::from(self.fire_drill)
    }

    /// Maps a roll in `0..total` onto an event kind.
    fn pick(&self, roll: u64) -> EventKind {
        let construction = u64::from(self.construction);
        if roll < construction {
            EventKind::Construction
        } else if roll < construction + u64::from(self.rain) {
            EventKind::Rain
        } else {
            EventKind::FireDrill
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventKind {
    Construction,
    Rain,
    FireDrill,
}

/// Configuration parameters required to construct the obstacle controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    interval_min: Duration,
    interval_max: Duration,
    cells_min: usize,
    cells_max: usize,
    scatter: u32,
    mix: EventMix,
    fire_drill_cells: usize,
    seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_min: DEFAULT_INTERVAL_MIN,
            interval_max: DEFAULT_INTERVAL_MAX,
            cells_min: DEFAULT_CELLS_MIN,
            cells_max: DEFAULT_CELLS_MAX,
            scatter: DEFAULT_SCATTER,
            mix: EventMix::default(),
            fire_drill_cells: DEFAULT_FIRE_DRILL_CELLS,
            seed: DEFAULT_SEED,
        }
    }
}

impl Config {
    /// Default cadence and site sizes driven by the provided seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Replaces the inclusive range the delay between two sites is drawn from.
    pub fn with_interval(mut self, min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min.is_zero() || min > max {
            return Err(ConfigError::InvalidInterval { min, max });
        }
        self.interval_min = min;
        self.interval_max = max;
        Ok(self)
    }

    /// Replaces the inclusive range the number of blocked cells is drawn from.
    pub fn with_cell_count(mut self, min: usize, max: usize) -> Result<Self, ConfigError> {
        if min == 0 || min > max {
            return Err(ConfigError::InvalidCellCount { min, max });
        }
        self.cells_min = min;
        self.cells_max = max;
        Ok(self)
    }

    /// Replaces how far from the player a site's reference cell may land.
    #[must_use]
    pub const fn with_scatter(mut self, scatter: u32) -> Self {
        self.scatter = scatter;
        self
    }

    /// Replaces the relative odds of each event kind.
    pub fn with_mix(mut self, mix: EventMix) -> Result<Self, ConfigError> {
        if mix.total() == 0 {
            return Err(ConfigError::EmptyMix);
        }
        self.mix = mix;
        Ok(self)
    }

    /// Replaces how many cells a fire drill closes.
    pub fn with_fire_drill_cells(mut self, cells: usize) -> Result<Self, ConfigError> {
        if cells == 0 {
            return Err(ConfigError::EmptyFireDrill);
        }
        self.fire_drill_cells = cells;
        Ok(self)
    }

    /// Relative odds of each event kind.
    #[must_use]
    pub const fn mix(&self) -> EventMix {
        self.mix
    }

    /// Number of cells a fire drill closes.
    #[must_use]
    pub const fn fire_drill_cells(&self) -> usize {
        self.fire_drill_cells
    }

    /// Inclusive bounds of the delay between two sites.
    #[must_use]
    pub const fn interval(&self) -> (Duration, Duration) {
        (self.interval_min, self.interval_max)
    }

    /// Inclusive bounds of the number of cells a site blocks.
    #[must_use]
    pub const fn cell_count(&self) -> (usize, usize) {
        (self.cells_min, self.cells_max)
    }

    /// Maximum column or row offset between the player and a site's reference cell.
    #[must_use]
    pub const fn scatter(&self) -> u32 {
        self.scatter
    }

    /// Seed driving every random draw.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

/// Pure system that emits obstacle and weather requests at random intervals.
///
/// Time only advances through [`Event::TimeAdvanced`], and all randomness
/// comes from a seeded generator, so identical event streams always produce
/// identical command streams.
#[derive(Debug)]
pub struct Obstacles {
    config: Config,
    rng: ChaCha8Rng,
    accumulator: Duration,
    next_interval: Duration,
}

impl Obstacles {
    /// Creates a new controller and draws the delay until the first site.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let next_interval = draw_interval(&mut rng, &config);
        Self {
            config,
            rng,
            accumulator: Duration::ZERO,
            next_interval,
        }
    }

    /// Time that must still elapse before the next request.
    #[must_use]
    pub fn time_until_next(&self) -> Duration {
        self.next_interval.saturating_sub(self.accumulator)
    }

    /// Consumes world events and emits the requests that fall due.
    ///
    /// `player` anchors where construction sites appear; without one, they are
    /// scattered uniformly over the grid. A freshly configured grid starts a
    /// new countdown with a newly drawn interval.
    pub fn handle(
        &mut self,
        events: &[Event],
        player: Option<CellCoord>,
        dimensions: (u32, u32),
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::GridConfigured { .. } => {
                    self.accumulator = Duration::ZERO;
                    self.next_interval = draw_interval(&mut self.rng, &self.config);
                }
                Event::TimeAdvanced { dt } => {
                    self.accumulator = self.accumulator.saturating_add(*dt);
                }
                _ => {}
            }
        }

        let (columns, rows) = dimensions;
        while self.accumulator >= self.next_interval {
            self.accumulator -= self.next_interval;
            self.next_interval = draw_interval(&mut self.rng, &self.config);

            if columns == 0 || rows == 0 {
                continue;
            }
            let roll = self.rng.gen_range(0..self.config.mix.total());
            let command = match self.config.mix.pick(roll) {
                EventKind::Construction => {
                    let near = self.pick_reference(player, columns, rows);
                    let count = self
                        .rng
                        .gen_range(self.config.cells_min..=self.config.cells_max);
                    Command::SpawnConstruction { near, count }
                }
                EventKind::Rain => Command::StartRain,
                EventKind::FireDrill => {
                    let count = self.config.fire_drill_cells;
                    let candidates = (0..count.saturating_mul(FIRE_DRILL_CANDIDATES_PER_CELL))
                        .map(|_| {
                            CellCoord::new(
                                self.rng.gen_range(0..columns),
                                self.rng.gen_range(0..rows),
                            )
                        })
                        .collect();
                    Command::SpawnFireDrill { candidates, count }
                }
            };
            debug!(
                "requesting {command:?}; next event in {:?}",
                self.next_interval
            );
            out.push(command);
        }
    }

    fn pick_reference(&mut self, player: Option<CellCoord>, columns: u32, rows: u32) -> CellCoord {
        match player {
            Some(anchor) => {
                let column = scatter(&mut self.rng, anchor.column(), self.config.scatter, columns);
                let row = scatter(&mut self.rng, anchor.row(), self.config.scatter, rows);
                CellCoord::new(column, row)
            }
            None => CellCoord::new(self.rng.gen_range(0..columns), self.rng.gen_range(0..rows)),
        }
    }
}

fn draw_interval(rng: &mut ChaCha8Rng, config: &Config) -> Duration {
    rng.gen_range(config.interval_min..=config.interval_max)
}

/// Offsets `value` by up to `radius` in either direction, clamped into `0..limit`.
fn scatter(rng: &mut ChaCha8Rng, value: u32, radius: u32, limit: u32) -> u32 {
    let low = value.saturating_sub(radius);
    let high = value.saturating_add(radius).min(limit.saturating_sub(1));
    if low >= high {
        return high;
    }
    rng.gen_range(low..=high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_stays_inside_the_grid() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let value = scatter(&mut rng, 1, 3, 4);
            assert!(value <= 3);
            let value = scatter(&mut rng, 18, 3, 20);
            assert!((15..=19).contains(&value));
        }
    }

    #[test]
    fn mix_rolls_map_onto_weighted_kinds() {
        let mix = EventMix {
            construction: 2,
            rain: 1,
            fire_drill: 3,
        };
        let kinds: Vec<EventKind> = (0..mix.total()).map(|roll| mix.pick(roll)).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Construction,
                EventKind::Construction,
                EventKind::Rain,
                EventKind::FireDrill,
                EventKind::FireDrill,
                EventKind::FireDrill,
            ]
        );
        assert_eq!(EventMix::construction_only().pick(0), EventKind::Construction);
    }

    #[test]
    fn rejects_empty_mixes_and_drills() {
        let silent = EventMix {
            construction: 0,
            rain: 0,
            fire_drill: 0,
        };
        assert_eq!(Config::default().with_mix(silent), Err(ConfigError::EmptyMix));
        assert_eq!(
            Config::default().with_fire_drill_cells(0),
            Err(ConfigError::EmptyFireDrill)
        );
    }

    #[test]
    fn rejects_inverted_ranges() {
        assert_eq!(
            Config::default().with_interval(Duration::from_secs(5), Duration::from_secs(1)),
            Err(ConfigError::InvalidInterval {
                min: Duration::from_secs(5),
                max: Duration::from_secs(1),
            })
        );
        assert_eq!(
            Config::default().with_cell_count(0, 3),
            Err(ConfigError::InvalidCellCount { min: 0, max: 3 })
        );
    }
}
