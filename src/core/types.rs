use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContributionFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ContributionFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            ContributionFrequency::Daily => 365,
            ContributionFrequency::Weekly => 52,
            ContributionFrequency::Monthly => 12,
        }
    }

    /// Divisor turning a monthly-equivalent amount into a per-period amount.
    /// 4.33 weeks and 30 days per month are fixed calculator conventions.
    pub fn monthly_divisor(self) -> f64 {
        match self {
            ContributionFrequency::Daily => 30.0,
            ContributionFrequency::Weekly => 4.33,
            ContributionFrequency::Monthly => 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepUpCadence {
    None,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl StepUpCadence {
    pub fn steps_per_year(self) -> Option<u32> {
        match self {
            StepUpCadence::None => None,
            StepUpCadence::Quarterly => Some(4),
            StepUpCadence::HalfYearly => Some(2),
            StepUpCadence::Yearly => Some(1),
        }
    }

    /// True when `period` is an exact multiple of `periods_per_year / steps_per_year`,
    /// taken as a real number. A daily plan has no whole-day quarter (91.25), so its
    /// quarterly and half-yearly step-ups only land on whole years.
    pub fn steps_up_at(self, period: u32, periods_per_year: u32) -> bool {
        match self.steps_per_year() {
            Some(steps) => {
                period > 0
                    && (u64::from(period) * u64::from(steps)) % u64::from(periods_per_year) == 0
            }
            None => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepUp {
    pub cadence: StepUpCadence,
    pub percent: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum CompoundingConvention {
    /// `(1 + r)^(1/n) - 1` per period: one year of periods compounds to exactly `1 + r`.
    #[default]
    Effective,
    /// `r / n` per period. Only kept to reproduce the historical 1,161,695 headline
    /// for 5,000 a month over 10 years at 12%; not an equal alternative to `Effective`.
    Nominal,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InvestmentMode {
    Recurring {
        frequency: ContributionFrequency,
        step_up: Option<StepUp>,
    },
    Lumpsum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfiguration {
    pub mode: InvestmentMode,
    /// Monthly-equivalent contribution for recurring plans, principal for lumpsum plans.
    pub amount: f64,
    pub horizon_years: u32,
    pub annual_return_percent: f64,
    pub inflation_percent: Option<f64>,
    pub tax_percent: Option<f64>,
    pub compounding: CompoundingConvention,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub month: f64,
    pub contributed: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub total_contributed: f64,
    pub total_gain: f64,
    pub maturity_value: f64,
    pub series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBreakdown {
    pub year: u32,
    pub contributed_in_year: f64,
    pub total_contributed: f64,
    pub value: f64,
}
