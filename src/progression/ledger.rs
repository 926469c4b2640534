//! Check-in arithmetic: streak advancement, milestone bonuses and the
//! resulting XP/level transition. Persistence lives in the store, which
//! applies a plan inside a single transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::LevelTable;
use crate::types::Streak;

pub const BASE_CHECK_IN_XP: i64 = 10;
pub const WEEKLY_MILESTONE_DAYS: i32 = 7;
pub const WEEKLY_MILESTONE_XP: i64 = 25;
pub const MONTHLY_MILESTONE_DAYS: i32 = 30;
pub const MONTHLY_MILESTONE_XP: i64 = 100;

/// Largest XP amount a single administrative grant may add.
pub const MAX_XP_AWARD: i64 = 10_000;

/// The UTC calendar day a timestamp falls on.
#[must_use]
pub fn utc_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// XP granted for the check-in that brings a streak to `streak_days`.
/// Weekly and monthly bonuses stack.
#[must_use]
pub fn check_in_xp(streak_days: i32) -> i64 {
    let mut xp = BASE_CHECK_IN_XP;
    if streak_days > 0 && streak_days % WEEKLY_MILESTONE_DAYS == 0 {
        xp += WEEKLY_MILESTONE_XP;
    }
    if streak_days > 0 && streak_days % MONTHLY_MILESTONE_DAYS == 0 {
        xp += MONTHLY_MILESTONE_XP;
    }
    xp
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInPlan {
    pub streak_days: i32,
    pub starts_streak: bool,
    pub xp_gained: i64,
    pub total_xp: i64,
    pub previous_level: i32,
    pub level: i32,
}

impl CheckInPlan {
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Computes the effect of one check-in. `active_streak_days` is the length
/// of the user's active streak before this check-in, if there is one.
#[must_use]
pub fn plan_check_in(
    table: &LevelTable,
    xp: i64,
    level: i32,
    active_streak_days: Option<i32>,
) -> CheckInPlan {
    let streak_days = active_streak_days.map_or(1, |days| days + 1);
    let xp_gained = check_in_xp(streak_days);
    let total_xp = xp + xp_gained;

    CheckInPlan {
        streak_days,
        starts_streak: active_streak_days.is_none(),
        xp_gained,
        total_xp,
        previous_level: level,
        level: table.level_for_xp(total_xp),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XpAward {
    pub xp_gained: i64,
    pub total_xp: i64,
    pub previous_level: i32,
    pub level: i32,
    pub leveled_up: bool,
}

#[must_use]
pub fn plan_xp_award(table: &LevelTable, xp: i64, level: i32, amount: i64) -> XpAward {
    let total_xp = xp + amount;
    let new_level = table.level_for_xp(total_xp);
    XpAward {
        xp_gained: amount,
        total_xp,
        previous_level: level,
        level: new_level,
        leveled_up: new_level > level,
    }
}

/// What a committed check-in did.
#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub day: NaiveDate,
    pub plan: CheckInPlan,
    pub streak: Streak,
}

/// What a relapse report did. `streak` is the archived streak, if any.
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    pub streak: Option<Streak>,
    pub total_relapses: i32,
}

impl ResetOutcome {
    #[must_use]
    pub fn reset(&self) -> bool {
        self.streak.is_some()
    }
}
