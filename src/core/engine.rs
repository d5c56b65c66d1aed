use log::debug;

use super::error::ProjectionError;
use super::types::{
    CompoundingConvention, ContributionFrequency, InvestmentMode, PlanConfiguration,
    ProjectionResult, SeriesPoint, StepUp, YearBreakdown,
};

const TARGET_SERIES_POINTS: u32 = 100;
const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, Copy, Default)]
struct Ledger {
    invested: f64,
    value: f64,
}

pub fn project(config: &PlanConfiguration) -> ProjectionResult {
    let mut series = Vec::new();

    let ledger = match config.mode {
        InvestmentMode::Recurring { frequency, step_up } => {
            let periods_per_year = frequency.periods_per_year();
            let total = total_periods(config.horizon_years, periods_per_year);
            let stride = series_stride(total);
            simulate_recurring(config, frequency, step_up, |period, ledger| {
                if period == 1 || period % stride == 0 || period == total {
                    series.push(SeriesPoint {
                        month: months_elapsed(period, periods_per_year),
                        contributed: ledger.invested,
                        value: ledger.value,
                    });
                }
            })
        }
        InvestmentMode::Lumpsum => simulate_lumpsum(config, |year, ledger| {
            series.push(SeriesPoint {
                month: f64::from(year * MONTHS_PER_YEAR),
                contributed: ledger.invested,
                value: ledger.value,
            });
        }),
    };

    let result = summarize(config, ledger, series);
    debug!(
        "projected {:?} over {} years: contributed={} gain={} maturity={} points={}",
        config.mode,
        config.horizon_years,
        result.total_contributed,
        result.total_gain,
        result.maturity_value,
        result.series.len()
    );
    result
}

pub fn try_project(config: &PlanConfiguration) -> Result<ProjectionResult, ProjectionError> {
    validate(config)?;
    Ok(project(config))
}

/// Year-end rows of the same simulation `project` runs. Like the series,
/// the rows are never inflation or tax adjusted.
pub fn yearly_breakdown(config: &PlanConfiguration) -> Vec<YearBreakdown> {
    let mut rows = Vec::with_capacity(config.horizon_years as usize);
    let mut invested_at_year_start = 0.0;

    match config.mode {
        InvestmentMode::Recurring { frequency, step_up } => {
            let periods_per_year = frequency.periods_per_year();
            simulate_recurring(config, frequency, step_up, |period, ledger| {
                if period % periods_per_year == 0 {
                    rows.push(YearBreakdown {
                        year: period / periods_per_year,
                        contributed_in_year: ledger.invested - invested_at_year_start,
                        total_contributed: ledger.invested,
                        value: ledger.value,
                    });
                    invested_at_year_start = ledger.invested;
                }
            });
        }
        InvestmentMode::Lumpsum => {
            simulate_lumpsum(config, |year, ledger| {
                if year == 0 {
                    return;
                }
                rows.push(YearBreakdown {
                    year,
                    contributed_in_year: ledger.invested - invested_at_year_start,
                    total_contributed: ledger.invested,
                    value: ledger.value,
                });
                invested_at_year_start = ledger.invested;
            });
        }
    }

    rows
}

pub fn validate(config: &PlanConfiguration) -> Result<(), ProjectionError> {
    if !config.amount.is_finite() || config.amount < 0.0 {
        return Err(ProjectionError::invalid(
            "amount",
            "must be a finite number >= 0",
        ));
    }

    if config.horizon_years == 0 {
        return Err(ProjectionError::invalid("horizon_years", "must be > 0"));
    }

    if !config.annual_return_percent.is_finite() || config.annual_return_percent < 0.0 {
        return Err(ProjectionError::invalid(
            "annual_return_percent",
            "must be a finite number >= 0",
        ));
    }

    for (field, rate) in [
        ("inflation_percent", config.inflation_percent),
        ("tax_percent", config.tax_percent),
    ] {
        if let Some(rate) = rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ProjectionError::invalid(field, "must be a finite number >= 0"));
            }
        }
    }

    if let Some(tax) = config.tax_percent {
        if tax > 100.0 {
            return Err(ProjectionError::invalid("tax_percent", "must be <= 100"));
        }
    }

    if let InvestmentMode::Recurring {
        step_up: Some(step_up),
        ..
    } = config.mode
    {
        if !step_up.percent.is_finite() || step_up.percent < 0.0 {
            return Err(ProjectionError::invalid(
                "step_up.percent",
                "must be a finite number >= 0",
            ));
        }
    }

    Ok(())
}

pub fn periodic_rate(
    annual_return_percent: f64,
    periods_per_year: u32,
    convention: CompoundingConvention,
) -> f64 {
    let annual = annual_return_percent / 100.0;
    let periods = f64::from(periods_per_year);
    match convention {
        CompoundingConvention::Effective => (1.0 + annual).powf(1.0 / periods) - 1.0,
        CompoundingConvention::Nominal => annual / periods,
    }
}

fn simulate_recurring(
    config: &PlanConfiguration,
    frequency: ContributionFrequency,
    step_up: Option<StepUp>,
    mut on_period: impl FnMut(u32, Ledger),
) -> Ledger {
    let periods_per_year = frequency.periods_per_year();
    let total = total_periods(config.horizon_years, periods_per_year);
    let growth = 1.0
        + periodic_rate(
            config.annual_return_percent,
            periods_per_year,
            config.compounding,
        );
    let step = step_up.map(|s| (s.cadence, 1.0 + s.percent / 100.0));

    let mut amount = config.amount / frequency.monthly_divisor();
    let mut ledger = Ledger::default();

    for period in 1..=total {
        if let Some((cadence, factor)) = step {
            if cadence.steps_up_at(period, periods_per_year) {
                amount *= factor;
            }
        }
        ledger.invested += amount;
        ledger.value = (ledger.value + amount) * growth;
        on_period(period, ledger);
    }

    ledger
}

fn simulate_lumpsum(config: &PlanConfiguration, mut on_year: impl FnMut(u32, Ledger)) -> Ledger {
    let growth = 1.0 + config.annual_return_percent / 100.0;
    let mut ledger = Ledger {
        invested: config.amount,
        value: config.amount,
    };
    on_year(0, ledger);

    for year in 1..=config.horizon_years {
        ledger.value *= growth;
        on_year(year, ledger);
    }

    ledger
}

fn summarize(
    config: &PlanConfiguration,
    ledger: Ledger,
    series: Vec<SeriesPoint>,
) -> ProjectionResult {
    let mut maturity = ledger.value;

    // Deflate first, then tax the real gain. A negative gain is taxed too and
    // lifts the maturity value back towards the principal.
    if let Some(inflation) = config.inflation_percent {
        maturity *= (1.0 + inflation / 100.0).powf(-f64::from(config.horizon_years));
    }
    if let Some(tax) = config.tax_percent.filter(|tax| *tax > 0.0) {
        let gains = maturity - ledger.invested;
        maturity -= gains * tax / 100.0;
    }

    ProjectionResult {
        total_contributed: round_currency(ledger.invested),
        total_gain: round_currency(maturity - ledger.invested),
        maturity_value: round_currency(maturity),
        series,
    }
}

fn total_periods(horizon_years: u32, periods_per_year: u32) -> u32 {
    horizon_years.saturating_mul(periods_per_year)
}

fn series_stride(total_periods: u32) -> u32 {
    (total_periods / TARGET_SERIES_POINTS).max(1)
}

fn months_elapsed(period: u32, periods_per_year: u32) -> f64 {
    f64::from(period) * f64::from(MONTHS_PER_YEAR) / f64::from(periods_per_year)
}

fn round_currency(value: f64) -> f64 {
    // `+ 0.0` folds a rounded -0.0 into 0.0.
    value.round() + 0.0
}
