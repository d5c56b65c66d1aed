use log::debug;

use super::error::ProjectionError;
use super::{PlanConfiguration, project, validate};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GoalType {
    /// Smallest periodic amount (or principal) that reaches the target.
    RequiredAmount,
    /// Smallest annual return, in percent, that reaches the target.
    RequiredReturn,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_maturity_value: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub maturity_value: f64,
}

#[derive(Debug, Clone)]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_maturity_value: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_maturity_value: Option<f64>,
    pub achieved_total_contributed: Option<f64>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

pub fn solve_goal(
    plan: &PlanConfiguration,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, ProjectionError> {
    validate(plan)?;
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_value = evaluate_candidate(plan, config.goal_type, config.search_min);
    let high_value = evaluate_candidate(plan, config.goal_type, config.search_max);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_value >= config.target_maturity_value {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets target at lower search bound.".to_string();
    } else if high_value < config.target_maturity_value {
        feasible = false;
        message = match config.goal_type {
            GoalType::RequiredAmount => "No feasible amount found within the search bounds.",
            GoalType::RequiredReturn => "No feasible return found within the search bounds.",
        }
        .to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let maturity_value = evaluate_candidate(plan, config.goal_type, mid);
            iterations.push(GoalSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                maturity_value,
            });

            if maturity_value >= config.target_maturity_value {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_value = Some(hi);
        feasible = true;
        message = match (converged, config.goal_type) {
            (true, GoalType::RequiredAmount) => "Solved required amount.".to_string(),
            (true, GoalType::RequiredReturn) => "Solved required annual return.".to_string(),
            (false, _) => {
                "Reached max iterations before tolerance was met; returning best estimate."
                    .to_string()
            }
        };
    }

    let mut achieved_maturity_value = None;
    let mut achieved_total_contributed = None;
    if let Some(value) = solved_value {
        let result = project(&with_candidate(plan, config.goal_type, value));
        achieved_maturity_value = Some(result.maturity_value);
        achieved_total_contributed = Some(result.total_contributed);
    }

    debug!(
        "goal {:?} target={} solved={:?} iterations={} feasible={}",
        config.goal_type,
        config.target_maturity_value,
        solved_value,
        iterations.len(),
        feasible
    );

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        target_maturity_value: config.target_maturity_value,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_maturity_value,
        achieved_total_contributed,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn with_candidate(
    plan: &PlanConfiguration,
    goal_type: GoalType,
    candidate: f64,
) -> PlanConfiguration {
    let mut plan = plan.clone();
    match goal_type {
        GoalType::RequiredAmount => plan.amount = candidate.max(0.0),
        GoalType::RequiredReturn => plan.annual_return_percent = candidate.max(0.0),
    }
    plan
}

fn evaluate_candidate(plan: &PlanConfiguration, goal_type: GoalType, candidate: f64) -> f64 {
    project(&with_candidate(plan, goal_type, candidate)).maturity_value
}

fn validate_config(config: GoalSolveConfig) -> Result<(), ProjectionError> {
    if !config.target_maturity_value.is_finite() || config.target_maturity_value <= 0.0 {
        return Err(ProjectionError::SolverBounds(
            "target_maturity_value must be > 0".to_string(),
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(ProjectionError::SolverBounds(
            "search bounds must be finite".to_string(),
        ));
    }
    if config.search_min < 0.0 {
        return Err(ProjectionError::SolverBounds(
            "search_min must be >= 0".to_string(),
        ));
    }
    if config.search_max <= config.search_min {
        return Err(ProjectionError::SolverBounds(
            "search_max must be greater than search_min".to_string(),
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(ProjectionError::SolverBounds(
            "tolerance must be > 0".to_string(),
        ));
    }
    if config.max_iterations == 0 {
        return Err(ProjectionError::SolverBounds(
            "max_iterations must be > 0".to_string(),
        ));
    }
    Ok(())
}
