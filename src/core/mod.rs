mod engine;
mod error;
mod solver;
mod types;

pub use engine::{periodic_rate, project, try_project, validate, yearly_breakdown};
pub use error::ProjectionError;
pub use solver::{GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, solve_goal};
pub use types::{
    CompoundingConvention, ContributionFrequency, InvestmentMode, PlanConfiguration,
    ProjectionResult, SeriesPoint, StepUp, StepUpCadence, YearBreakdown,
};
