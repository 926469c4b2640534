mod ledger;
mod levels;

pub use ledger::{
    BASE_CHECK_IN_XP, CheckInOutcome, CheckInPlan, MAX_XP_AWARD, MONTHLY_MILESTONE_DAYS,
    MONTHLY_MILESTONE_XP, ResetOutcome, WEEKLY_MILESTONE_DAYS, WEEKLY_MILESTONE_XP, XpAward,
    check_in_xp, plan_check_in, plan_xp_award, utc_day,
};
pub use levels::{LevelTable, LevelTier, Progress};
