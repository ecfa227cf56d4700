//! TOML configuration shared by every subcommand.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use campus_runner_core::Rules;
use campus_runner_system_obstacles as obstacles;
use campus_runner_system_patrol as patrol;
use serde::Deserialize;

/// Fully validated settings handed to the simulation.
#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) rules: Rules,
    pub(crate) obstacles: obstacles::Config,
    pub(crate) patrol: patrol::Config,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    rules: Rules,
    obstacles: ObstacleSection,
    patrol: PatrolSection,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ObstacleSection {
    min_interval: f64,
    max_interval: f64,
    min_cells: usize,
    max_cells: usize,
    scatter: u32,
    construction: u32,
    rain: u32,
    fire_drill: u32,
    fire_drill_cells: usize,
    seed: u64,
}

impl Default for ObstacleSection {
    fn default() -> Self {
        let defaults = obstacles::Config::default();
        let (min_interval, max_interval) = defaults.interval();
        let (min_cells, max_cells) = defaults.cell_count();
        let mix = defaults.mix();
        Self {
            min_interval: min_interval.as_secs_f64(),
            max_interval: max_interval.as_secs_f64(),
            min_cells,
            max_cells,
            scatter: defaults.scatter(),
            construction: mix.construction,
            rain: mix.rain,
            fire_drill: mix.fire_drill,
            fire_drill_cells: defaults.fire_drill_cells(),
            seed: defaults.seed(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PatrolSection {
    step_delay: f64,
    chase_speed: f32,
    idle_delay: f64,
    interact_duration: f64,
    guard_detection: f32,
    detection: f32,
    reach: f32,
}

impl Default for PatrolSection {
    fn default() -> Self {
        let defaults = patrol::Config::default();
        Self {
            step_delay: defaults.step_delay.as_secs_f64(),
            chase_speed: defaults.chase_speed,
            idle_delay: defaults.idle_delay.as_secs_f64(),
            interact_duration: defaults.interact_duration.as_secs_f64(),
            guard_detection: defaults.guard_detection,
            detection: defaults.detection,
            reach: defaults.reach,
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or falls back to the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("invalid config {}", path.display()))
            }
            None => Self::from_file(FileConfig::default()),
        }
    }

    /// Parses and validates settings from TOML text.
    pub(crate) fn from_toml(text: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(text).context("malformed TOML")?;
        Self::from_file(file)
    }

    /// Replaces the seed driving obstacle placement.
    pub(crate) fn reseed(&mut self, seed: u64) -> Result<()> {
        let (min_interval, max_interval) = self.obstacles.interval();
        let (min_cells, max_cells) = self.obstacles.cell_count();
        self.obstacles = obstacles::Config::seeded(seed)
            .with_interval(min_interval, max_interval)?
            .with_cell_count(min_cells, max_cells)?
            .with_scatter(self.obstacles.scatter())
            .with_mix(self.obstacles.mix())?
            .with_fire_drill_cells(self.obstacles.fire_drill_cells())?;
        Ok(())
    }

    fn from_file(file: FileConfig) -> Result<Self> {
        file.rules.validate().context("invalid [rules]")?;

        let section = file.obstacles;
        let obstacles = obstacles::Config::seeded(section.seed)
            .with_interval(
                seconds(section.min_interval, "obstacles.min_interval")?,
                seconds(section.max_interval, "obstacles.max_interval")?,
            )?
            .with_cell_count(section.min_cells, section.max_cells)?
            .with_scatter(section.scatter)
            .with_mix(obstacles::EventMix {
                construction: section.construction,
                rain: section.rain,
                fire_drill: section.fire_drill,
            })?
            .with_fire_drill_cells(section.fire_drill_cells)?;

        let section = file.patrol;
        let patrol = patrol::Config {
            step_delay: seconds(section.step_delay, "patrol.step_delay")?,
            chase_speed: section.chase_speed,
            idle_delay: seconds(section.idle_delay, "patrol.idle_delay")?,
            interact_duration: seconds(section.interact_duration, "patrol.interact_duration")?,
            guard_detection: section.guard_detection,
            detection: section.detection,
            reach: section.reach,
        };
        patrol.validate().context("invalid [patrol]")?;

        Ok(Self {
            rules: file.rules,
            obstacles,
            patrol,
        })
    }
}

fn seconds(value: f64, field: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{field} must be a non-negative number of seconds"))
}
