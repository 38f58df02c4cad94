use std::collections::BTreeMap;

use serde::Serialize;

use super::error::{SimResult, ensure_finite_non_negative, invalid};

pub const MONTHS_PER_YEAR: usize = 12;
pub const INITIAL_SHARE_PRICE: f64 = 100.0;
pub const DEFAULT_MEAN_REVERSION_STRENGTH: f64 = -0.35;
pub const MAX_TOTAL_YEARS: u32 = 150;

/// Year index (0-based, year in which the raise takes effect) to raise fraction.
pub type Milestones = BTreeMap<u32, f64>;

#[derive(Debug, Clone, PartialEq)]
pub enum ContributionSource {
    Fixed(f64),
    Schedule(Vec<f64>),
}

impl ContributionSource {
    pub fn amount_for(&self, month_index: usize) -> f64 {
        match self {
            ContributionSource::Fixed(amount) => *amount,
            ContributionSource::Schedule(schedule) => schedule[month_index],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MeanReversion {
    /// Negative: a below-expectation year raises the following year's drift.
    pub strength: f64,
}

impl Default for MeanReversion {
    fn default() -> Self {
        Self {
            strength: DEFAULT_MEAN_REVERSION_STRENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub contribution: ContributionSource,
    pub annual_return_pct: f64,
    pub annual_vol_pct: f64,
    pub total_years: u32,
    pub starting_balance: f64,
    pub mean_reversion: Option<MeanReversion>,
}

impl SimulationConfig {
    pub fn total_months(&self) -> usize {
        self.total_years as usize * MONTHS_PER_YEAR
    }

    pub fn as_benchmark(&self) -> Self {
        Self {
            annual_vol_pct: 0.0,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        ensure_horizon(self.total_years)?;

        if !self.annual_return_pct.is_finite() || self.annual_return_pct <= -100.0 {
            return Err(invalid(
                "annual_return_pct",
                format!("must be finite and > -100, got {}", self.annual_return_pct),
            ));
        }

        ensure_finite_non_negative("annual_vol_pct", self.annual_vol_pct)?;
        ensure_finite_non_negative("starting_balance", self.starting_balance)?;

        match &self.contribution {
            ContributionSource::Fixed(amount) => {
                ensure_finite_non_negative("monthly_amount", *amount)?;
            }
            ContributionSource::Schedule(schedule) => {
                if schedule.len() != self.total_months() {
                    return Err(invalid(
                        "contribution_schedule",
                        format!(
                            "expected {} monthly entries for {} years, got {}",
                            self.total_months(),
                            self.total_years,
                            schedule.len()
                        ),
                    ));
                }
                for amount in schedule {
                    ensure_finite_non_negative("contribution_schedule", *amount)?;
                }
            }
        }

        if let Some(reversion) = self.mean_reversion {
            if !reversion.strength.is_finite() {
                return Err(invalid("mean_reversion_strength", "must be finite"));
            }
        }

        Ok(())
    }
}

pub(crate) fn ensure_horizon(total_years: u32) -> SimResult<()> {
    if !(1..=MAX_TOTAL_YEARS).contains(&total_years) {
        return Err(invalid(
            "total_years",
            format!("must be between 1 and {MAX_TOTAL_YEARS}, got {total_years}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySnapshot {
    pub month: u32,
    pub monthly_return: f64,
    pub invested: f64,
    pub total_invested: f64,
    pub balance: f64,
    pub share_price: f64,
    pub shares_bought: f64,
    pub total_shares: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    pub starting_balance: f64,
    pub snapshots: Vec<MonthlySnapshot>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn final_balance(&self) -> f64 {
        self.snapshots
            .last()
            .map_or(self.starting_balance, |s| s.balance)
    }

    pub fn final_total_invested(&self) -> f64 {
        self.snapshots
            .last()
            .map_or(self.starting_balance, |s| s.total_invested)
    }

    pub fn years(&self) -> f64 {
        self.snapshots.len() as f64 / MONTHS_PER_YEAR as f64
    }

    pub fn balances(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.balance).collect()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Granularity {
    #[default]
    Yearly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub period: String,
    pub contribution: f64,
    pub period_return: f64,
    pub period_return_pct: f64,
    pub total_invested: f64,
    pub value: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryScheduleRow {
    pub year: u32,
    pub age: u32,
    pub monthly_salary: f64,
    pub monthly_contribution: f64,
    pub annual_contribution: f64,
    pub milestone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineStats {
    pub total_invested: f64,
    pub final_value: f64,
    pub total_gain: f64,
    pub total_gain_pct: f64,
    pub annualized_return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleBand {
    pub paths: u32,
    pub p10_balance: Vec<f64>,
    pub median_balance: Vec<f64>,
    pub p90_balance: Vec<f64>,
    pub p10_final: f64,
    pub median_final: f64,
    pub p90_final: f64,
}
