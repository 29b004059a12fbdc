use serde::{Deserialize, Serialize};

/// Experience cost ladder: advancing from level `L` costs `base + (L - 1) * step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLadder {
    pub base: u64,
    pub step: u64,
}

pub const DEFAULT_LEVEL_LADDER: LevelLadder = LevelLadder {
    base: 100,
    step: 50,
};

impl Default for LevelLadder {
    fn default() -> Self {
        DEFAULT_LEVEL_LADDER
    }
}

/// Where a total sits on the ladder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelStanding {
    pub level: u32,
    /// Experience earned since reaching `level`.
    pub into_level: u64,
    /// Experience needed to go from `level` to `level + 1`.
    pub level_cost: u64,
}

impl LevelStanding {
    /// Percent of the way to the next level, within `[0, 100]`.
    pub fn progress_percent(&self) -> f64 {
        if self.level_cost == 0 {
            return 100.0;
        }
        let percent = self.into_level as f64 / self.level_cost as f64 * 100.0;
        percent.clamp(0.0, 100.0)
    }
}

impl LevelLadder {
    /// Experience needed to advance from `level` to `level + 1`.
    pub fn cost_of(&self, level: u32) -> u64 {
        let steps = u64::from(level.max(1) - 1);
        self.base.saturating_add(steps.saturating_mul(self.step))
    }

    /// Cumulative experience needed to reach `level` from level 1.
    pub fn threshold_for(&self, level: u32) -> u64 {
        (1..level.max(1)).fold(0_u64, |acc, lvl| acc.saturating_add(self.cost_of(lvl)))
    }

    pub fn standing(&self, total_xp: u64) -> LevelStanding {
        let mut level = 1_u32;
        let mut remaining = total_xp;

        loop {
            let cost = self.cost_of(level);
            // A zero-cost ladder would never terminate.
            if cost == 0 || remaining < cost || level == u32::MAX {
                return LevelStanding {
                    level,
                    into_level: remaining,
                    level_cost: cost,
                };
            }
            remaining -= cost;
            level += 1;
        }
    }

    pub fn level_for(&self, total_xp: u64) -> u32 {
        self.standing(total_xp).level
    }

    pub fn progress_percent(&self, total_xp: u64) -> f64 {
        self.standing(total_xp).progress_percent()
    }
}
