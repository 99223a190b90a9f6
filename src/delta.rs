use crate::models::SimulationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
    NoChange,
}

impl Direction {
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Increase => "↑",
            Direction::Decrease => "↓",
            Direction::NoChange => "–",
        }
    }

    pub fn tone(&self) -> &'static str {
        match self {
            Direction::Increase => "positive",
            Direction::Decrease => "negative",
            Direction::NoChange => "neutral",
        }
    }
}

pub fn direction(score_improvement: i64) -> Direction {
    match score_improvement {
        v if v > 0 => Direction::Increase,
        v if v < 0 => Direction::Decrease,
        _ => Direction::NoChange,
    }
}

pub fn magnitude(score_improvement: i64) -> u64 {
    score_improvement.unsigned_abs()
}

/// Bar fill for a percentage, clamped to 0..=100.
pub fn bar_percent(score: u32) -> u32 {
    score.min(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationDelta {
    pub direction: Direction,
    pub magnitude: u64,
    pub baseline_bar: u32,
    pub scenario_bar: u32,
}

impl From<&SimulationResult> for SimulationDelta {
    fn from(result: &SimulationResult) -> Self {
        Self {
            direction: direction(result.score_improvement),
            magnitude: magnitude(result.score_improvement),
            baseline_bar: bar_percent(result.baseline_score),
            scenario_bar: bar_percent(result.scenario_score),
        }
    }
}
