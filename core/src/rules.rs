//! Tunable gameplay rules consumed by the world.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TileKind;

const DEFAULT_CONSTRUCTION_TTL: Duration = Duration::from_secs(45);
const DEFAULT_UNDO_CAPACITY: usize = 50;
const DEFAULT_TRAP_PENALTY: Duration = Duration::from_secs(5);
const DEFAULT_BOOSTER_DURATION: Duration = Duration::from_secs(3);
const DEFAULT_BOOSTER_MULTIPLIER: f32 = 2.0;
const DEFAULT_RAIN_MULTIPLIER: u32 = 2;
const DEFAULT_RAIN_DURATION: Duration = Duration::from_secs(20);
const DEFAULT_FIRE_DRILL_TTL: Duration = Duration::from_secs(25);

/// Reasons a rule set may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// A walkable tile kind was given a zero movement cost.
    #[error("tile weight for {kind:?} must be at least 1")]
    ZeroWeight {
        /// Tile kind carrying the invalid weight.
        kind: TileKind,
    },
    /// The undo history was configured to hold nothing.
    #[error("undo capacity must be at least 1")]
    ZeroUndoCapacity,
    /// The booster multiplier would not speed anyone up.
    #[error("booster multiplier must be a finite value of at least 1.0")]
    InvalidBoosterMultiplier,
    /// Rain was configured to make movement free.
    #[error("rain multiplier must be at least 1")]
    ZeroRainMultiplier,
}

/// Cost of entering each walkable tile kind.
///
/// Weights are whole numbers of at least one so that search costs compare
/// exactly and the Manhattan heuristic stays admissible once it is scaled by
/// [`TileWeights::min_weight`]. The default table prices ice like a walkway;
/// a cheaper ice lane needs a table such as [`TileWeights::sliding`].
/// Unlocked gates cost the same as a walkway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileWeights {
    /// Cost of entering a normal walkway.
    pub normal: u32,
    /// Cost of entering an ice tile.
    pub ice: u32,
    /// Cost of entering a grass tile.
    pub grass: u32,
    /// Cost of entering a water tile.
    pub water: u32,
    /// Cost of entering a portal tile.
    pub portal: u32,
    /// Cost of entering a trap tile.
    pub trap: u32,
    /// Cost of entering a booster tile.
    pub booster: u32,
    /// Cost of entering a key tile.
    pub key: u32,
}

impl Default for TileWeights {
    fn default() -> Self {
        Self {
            normal: 1,
            ice: 1,
            grass: 2,
            water: 4,
            portal: 1,
            trap: 1,
            booster: 1,
            key: 1,
        }
    }
}

impl TileWeights {
    /// A table where every walkable kind costs one, turning A* into an unweighted search.
    #[must_use]
    pub const fn uniform() -> Self {
        Self {
            normal: 1,
            ice: 1,
            grass: 1,
            water: 1,
            portal: 1,
            trap: 1,
            booster: 1,
            key: 1,
        }
    }

    /// Doubles the default table except for ice, so sliding lanes are cheaper than walkways.
    #[must_use]
    pub const fn sliding() -> Self {
        Self {
            normal: 2,
            ice: 1,
            grass: 4,
            water: 8,
            portal: 2,
            trap: 2,
            booster: 2,
            key: 2,
        }
    }

    /// Cost of entering a tile of the provided kind, or `None` when it is impassable.
    #[must_use]
    pub const fn weight(&self, kind: TileKind) -> Option<u32> {
        match kind {
            TileKind::Normal => Some(self.normal),
            TileKind::Ice => Some(self.ice),
            TileKind::Grass => Some(self.grass),
            TileKind::Water => Some(self.water),
            TileKind::Portal => Some(self.portal),
            TileKind::Trap => Some(self.trap),
            TileKind::Booster => Some(self.booster),
            TileKind::Key => Some(self.key),
            TileKind::Wall | TileKind::Construction | TileKind::LockedGate => None,
        }
    }

    /// Cheapest weight in the table.
    #[must_use]
    pub fn min_weight(&self) -> u32 {
        self.entries()
            .iter()
            .map(|(_, weight)| *weight)
            .min()
            .unwrap_or(1)
            .max(1)
    }

    /// Rejects tables containing zero-cost tiles.
    pub fn validate(&self) -> Result<(), RulesError> {
        match self.entries().iter().find(|(_, weight)| *weight == 0) {
            Some((kind, _)) => Err(RulesError::ZeroWeight { kind: *kind }),
            None => Ok(()),
        }
    }

    fn entries(&self) -> [(TileKind, u32); 8] {
        [
            (TileKind::Normal, self.normal),
            (TileKind::Ice, self.ice),
            (TileKind::Grass, self.grass),
            (TileKind::Water, self.water),
            (TileKind::Portal, self.portal),
            (TileKind::Trap, self.trap),
            (TileKind::Booster, self.booster),
            (TileKind::Key, self.key),
        ]
    }
}

/// Gameplay rules that govern movement costs, obstacles, effects, and undo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Cost table used by weighted searches.
    pub weights: TileWeights,
    /// How long a construction site blocks its cells.
    #[serde(with = "seconds")]
    pub construction_ttl: Duration,
    /// Maximum number of undo entries kept per actor.
    pub undo_capacity: usize,
    /// Time charged when an actor first enters a trap cell.
    #[serde(with = "seconds")]
    pub trap_penalty: Duration,
    /// How long a booster stays active.
    #[serde(with = "seconds")]
    pub booster_duration: Duration,
    /// Speed multiplier granted while a booster is active.
    pub booster_multiplier: f32,
    /// Upper bound on extra cells travelled in one slide; unbounded when absent.
    pub ice_slide_limit: Option<u32>,
    /// Factor applied to every movement cost while it rains.
    pub rain_multiplier: u32,
    /// How long one shower lasts.
    #[serde(with = "seconds")]
    pub rain_duration: Duration,
    /// How long a fire drill keeps its cells closed.
    #[serde(with = "seconds")]
    pub fire_drill_ttl: Duration,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            weights: TileWeights::default(),
            construction_ttl: DEFAULT_CONSTRUCTION_TTL,
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            trap_penalty: DEFAULT_TRAP_PENALTY,
            booster_duration: DEFAULT_BOOSTER_DURATION,
            booster_multiplier: DEFAULT_BOOSTER_MULTIPLIER,
            ice_slide_limit: None,
            rain_multiplier: DEFAULT_RAIN_MULTIPLIER,
            rain_duration: DEFAULT_RAIN_DURATION,
            fire_drill_ttl: DEFAULT_FIRE_DRILL_TTL,
        }
    }
}

impl Rules {
    /// Checks the rule set for values the world cannot honour.
    pub fn validate(&self) -> Result<(), RulesError> {
        self.weights.validate()?;
        if self.undo_capacity == 0 {
            return Err(RulesError::ZeroUndoCapacity);
        }
        if !self.booster_multiplier.is_finite() || self.booster_multiplier < 1.0 {
            return Err(RulesError::InvalidBoosterMultiplier);
        }
        if self.rain_multiplier == 0 {
            return Err(RulesError::ZeroRainMultiplier);
        }
        Ok(())
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_are_valid() {
        assert_eq!(Rules::default().validate(), Ok(()));
        assert_eq!(Rules::default().construction_ttl, Duration::from_secs(45));
        assert_eq!(Rules::default().undo_capacity, 50);
    }

    #[test]
    fn zero_weight_is_rejected() {
        let weights = TileWeights {
            grass: 0,
            ..TileWeights::default()
        };
        assert_eq!(
            weights.validate(),
            Err(RulesError::ZeroWeight {
                kind: TileKind::Grass
            })
        );
    }

    #[test]
    fn impassable_kinds_have_no_weight() {
        let weights = TileWeights::default();
        assert_eq!(weights.weight(TileKind::Wall), None);
        assert_eq!(weights.weight(TileKind::Construction), None);
        assert_eq!(weights.weight(TileKind::LockedGate), None);
        assert_eq!(weights.weight(TileKind::Key), Some(1));
        assert_eq!(weights.weight(TileKind::Water), Some(4));
        assert_eq!(weights.min_weight(), 1);
    }

    #[test]
    fn sliding_table_makes_ice_the_cheapest_tile() {
        let weights = TileWeights::sliding();
        assert_eq!(weights.validate(), Ok(()));
        assert_eq!(weights.min_weight(), 1);
        let ice = weights.weight(TileKind::Ice);
        for kind in [TileKind::Normal, TileKind::Grass, TileKind::Booster, TileKind::Key] {
            assert!(ice < weights.weight(kind), "{kind:?}");
        }
        assert_eq!(TileWeights::default().weight(TileKind::Ice), Some(1));
    }

    #[test]
    fn zero_rain_multiplier_is_rejected() {
        let rules = Rules {
            rain_multiplier: 0,
            ..Rules::default()
        };
        assert_eq!(rules.validate(), Err(RulesError::ZeroRainMultiplier));
        assert_eq!(Rules::default().rain_duration, Duration::from_secs(20));
        assert_eq!(Rules::default().fire_drill_ttl, Duration::from_secs(25));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let rules: Rules = toml::from_str(
            r#"
            construction_ttl = 12.5
            undo_capacity = 8

            [weights]
            grass = 3
            "#,
        )
        .expect("rules parse");

        assert_eq!(rules.construction_ttl, Duration::from_millis(12_500));
        assert_eq!(rules.undo_capacity, 8);
        assert_eq!(rules.weights.grass, 3);
        assert_eq!(rules.weights.water, 4);
        assert_eq!(rules.trap_penalty, Duration::from_secs(5));
    }

    #[test]
    fn negative_durations_fail_to_parse() {
        let parsed: Result<Rules, _> = toml::from_str("trap_penalty = -1.0");
        assert!(parsed.is_err());
    }
}
