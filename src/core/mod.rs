mod engine;
mod types;

pub use engine::{horizon_in_months, monthly_rate, project, round_currency};
pub use types::{
    HorizonUnit, PeriodSnapshot, RateBasis, SimulationParameters, SimulationResult,
    SimulationSummary,
};
