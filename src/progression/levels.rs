//! Level table and resolver.
//!
//! The table is sparse: tiers are keyed by the first level at which they
//! apply, so a level that falls between two tiers belongs to the lower one.

use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named band of levels starting at `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTier {
    pub level: i32,
    pub name: String,
    pub description: String,
    pub color: String,
    pub xp_threshold: i64,
}

/// Progress snapshot for a user at a given XP and level.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub xp: i64,
    pub level: i32,
    pub tier: LevelTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<LevelTier>,
    pub progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp_to_next: Option<i64>,
    pub max_level: bool,
}

/// An immutable, versioned level table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelTable {
    version: u32,
    tiers: Vec<LevelTier>,
}

// (level, name, description, color, xp_threshold)
const BUILTIN_TIERS: &[(i32, &str, &str, &str, i64)] = &[
    (1, "Seedling", "Every journey starts with a single day.", "#9CA3AF", 0),
    (2, "Sprout", "The first habits are taking hold.", "#A3E635", 50),
    (3, "Sapling", "Small wins are stacking up.", "#84CC16", 120),
    (4, "Rooted", "You know why you started.", "#65A30D", 200),
    (5, "Steady", "Consistency is becoming familiar.", "#22C55E", 300),
    (6, "Grounded", "Cravings no longer set the pace.", "#16A34A", 420),
    (7, "Resilient", "Setbacks bend you but do not break you.", "#14B8A6", 560),
    (8, "Determined", "You show up even on hard days.", "#0D9488", 720),
    (9, "Focused", "Your attention is yours again.", "#06B6D4", 900),
    (10, "Committed", "Ten levels of deliberate choices.", "#0EA5E9", 1100),
    (12, "Anchored", "Triggers have less pull than before.", "#3B82F6", 1500),
    (14, "Unshaken", "Old patterns rarely surface.", "#2563EB", 2000),
    (16, "Disciplined", "Routine carries you forward.", "#6366F1", 2600),
    (18, "Pathfinder", "You are finding your own way.", "#4F46E5", 3300),
    (20, "Trailblazer", "Others can follow the path you made.", "#8B5CF6", 4100),
    (22, "Guardian", "You protect what you have built.", "#7C3AED", 5000),
    (24, "Sentinel", "Vigilant without being anxious.", "#A855F7", 6000),
    (26, "Vanguard", "Leading by example.", "#D946EF", 7200),
    (30, "Steadfast", "A month of levels on a single plateau.", "#EC4899", 9000),
    (35, "Luminary", "Your progress lights the way for others.", "#F43F5E", 11500),
    (40, "Paragon", "A model of lasting change.", "#F97316", 14500),
    (45, "Sage", "Wisdom earned one day at a time.", "#F59E0B", 18000),
    (50, "Legend", "The habit no longer defines you.", "#EAB308", 22000),
];

static BUILTIN: LazyLock<LevelTable> = LazyLock::new(|| LevelTable {
    version: 1,
    tiers: BUILTIN_TIERS
        .iter()
        .map(|&(level, name, description, color, xp_threshold)| LevelTier {
            level,
            name: name.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            xp_threshold,
        })
        .collect(),
});

impl LevelTable {
    /// Builds a table, rejecting anything that breaks the ordering invariants.
    pub fn new(version: u32, tiers: Vec<LevelTier>) -> Result<Self> {
        let first = tiers
            .first()
            .ok_or_else(|| Error::Config("level table has no tiers".to_string()))?;

        if first.xp_threshold != 0 {
            return Err(Error::Config(format!(
                "lowest tier (level {}) must have an xp_threshold of 0",
                first.level
            )));
        }

        for pair in tiers.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.level <= a.level {
                return Err(Error::Config(format!(
                    "tier levels must be strictly ascending ({} then {})",
                    a.level, b.level
                )));
            }
            if b.xp_threshold <= a.xp_threshold {
                return Err(Error::Config(format!(
                    "xp_threshold must strictly increase (level {} has {}, level {} has {})",
                    a.level, a.xp_threshold, b.level, b.xp_threshold
                )));
            }
        }

        Ok(Self { version, tiers })
    }

    /// The table compiled into the binary.
    #[must_use]
    pub fn builtin() -> &'static LevelTable {
        &BUILTIN
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: LevelTable = toml::from_str(content)
            .map_err(|e| Error::Config(format!("invalid level table: {e}")))?;
        Self::new(raw.version, raw.tiers)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn tiers(&self) -> &[LevelTier] {
        &self.tiers
    }

    #[must_use]
    pub fn lowest(&self) -> &LevelTier {
        &self.tiers[0]
    }

    #[must_use]
    pub fn highest(&self) -> &LevelTier {
        &self.tiers[self.tiers.len() - 1]
    }

    /// Returns the tier with the greatest level `<= level`, or the lowest
    /// tier when the input is below every tier.
    #[must_use]
    pub fn resolve_tier(&self, level: i32) -> &LevelTier {
        let idx = self.tiers.partition_point(|t| t.level <= level);
        if idx == 0 {
            self.lowest()
        } else {
            &self.tiers[idx - 1]
        }
    }

    /// Returns the first tier strictly above `level`, if any.
    #[must_use]
    pub fn next_tier(&self, level: i32) -> Option<&LevelTier> {
        let idx = self.tiers.partition_point(|t| t.level <= level);
        self.tiers.get(idx)
    }

    /// Percentage of the way from the current tier's threshold to the next
    /// tier's threshold, clamped to `[0, 100]`.
    #[must_use]
    pub fn progress_fraction(&self, xp: i64, level: i32) -> f64 {
        let level = level.max(self.lowest().level);
        let current = self.resolve_tier(level);
        let Some(next) = self.next_tier(level) else {
            return 100.0;
        };

        let span = (next.xp_threshold - current.xp_threshold) as f64;
        let earned = (xp - current.xp_threshold) as f64;
        (earned / span * 100.0).clamp(0.0, 100.0)
    }

    /// Derives a level number from cumulative XP.
    ///
    /// Inside a gap between two tiers the level is interpolated linearly, so
    /// a user between the level 26 and level 30 thresholds passes through
    /// 27, 28 and 29.
    #[must_use]
    pub fn level_for_xp(&self, xp: i64) -> i32 {
        let idx = self.tiers.partition_point(|t| t.xp_threshold <= xp);
        if idx == 0 {
            return self.lowest().level;
        }

        let current = &self.tiers[idx - 1];
        let Some(next) = self.tiers.get(idx) else {
            return current.level;
        };

        // i128 so that wide thresholds from an override table cannot overflow.
        let level_span = i128::from(next.level) - i128::from(current.level);
        let xp_span = i128::from(next.xp_threshold) - i128::from(current.xp_threshold);
        let earned = i128::from(xp) - i128::from(current.xp_threshold);
        let offset = earned * level_span / xp_span;
        let level = i128::from(current.level) + offset;
        i32::try_from(level).map_or(next.level - 1, |l| l.min(next.level - 1))
    }

    #[must_use]
    pub fn progress(&self, xp: i64, level: i32) -> Progress {
        let tier = self.resolve_tier(level).clone();
        let next_tier = self.next_tier(level.max(self.lowest().level)).cloned();
        let xp_to_next = next_tier
            .as_ref()
            .map(|next| (next.xp_threshold - xp).max(0));

        Progress {
            xp,
            level,
            progress_percent: self.progress_fraction(xp, level),
            max_level: next_tier.is_none(),
            tier,
            next_tier,
            xp_to_next,
        }
    }
}
