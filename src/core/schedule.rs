use super::error::{SimResult, ensure_finite_non_negative, invalid};
use super::types::{
    ContributionSource, MONTHS_PER_YEAR, Milestones, SalaryScheduleRow, ensure_horizon,
};

pub fn standard_milestones() -> Milestones {
    Milestones::from([(3, 0.20), (6, 0.18), (10, 0.22), (15, 0.25)])
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalaryGrowthPlan {
    pub net_monthly_income: f64,
    pub investment_rate_pct: f64,
    pub milestones: Milestones,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContributionPlan {
    Fixed { monthly_amount: f64 },
    SalaryGrowth(SalaryGrowthPlan),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltContributions {
    pub source: ContributionSource,
    /// Present only in salary-growth mode, aligned month for month with the source.
    pub salary_schedule: Option<Vec<f64>>,
}

impl ContributionPlan {
    pub fn build(&self, total_years: u32) -> SimResult<BuiltContributions> {
        ensure_horizon(total_years)?;
        match self {
            ContributionPlan::Fixed { monthly_amount } => {
                ensure_finite_non_negative("monthly_amount", *monthly_amount)?;
                Ok(BuiltContributions {
                    source: ContributionSource::Fixed(*monthly_amount),
                    salary_schedule: None,
                })
            }
            ContributionPlan::SalaryGrowth(plan) => {
                plan.validate()?;
                let salary = generate_salary_schedule(
                    plan.net_monthly_income,
                    total_years,
                    &plan.milestones,
                );
                let contributions = generate_investment_schedule(&salary, plan.investment_rate_pct);
                Ok(BuiltContributions {
                    source: ContributionSource::Schedule(contributions),
                    salary_schedule: Some(salary),
                })
            }
        }
    }
}

impl SalaryGrowthPlan {
    fn validate(&self) -> SimResult<()> {
        if !self.net_monthly_income.is_finite() || self.net_monthly_income <= 0.0 {
            return Err(invalid(
                "net_monthly_income",
                format!("must be > 0, got {}", self.net_monthly_income),
            ));
        }
        if !(0.0..=100.0).contains(&self.investment_rate_pct) {
            return Err(invalid(
                "investment_rate_pct",
                format!("must be between 0 and 100, got {}", self.investment_rate_pct),
            ));
        }
        for (year, raise) in &self.milestones {
            if !raise.is_finite() || *raise <= -1.0 {
                return Err(invalid(
                    "milestones",
                    format!("raise for year {year} must be > -100%, got {raise}"),
                ));
            }
        }
        Ok(())
    }
}

/// A milestone at year index `k` multiplies the running salary once, before
/// the 12 entries of year `k` are written.
pub fn generate_salary_schedule(
    starting_net_monthly: f64,
    total_years: u32,
    milestones: &Milestones,
) -> Vec<f64> {
    let mut schedule = Vec::with_capacity(total_years as usize * MONTHS_PER_YEAR);
    let mut current_salary = starting_net_monthly;

    for year in 0..total_years {
        if let Some(raise) = milestones.get(&year) {
            current_salary *= 1.0 + raise;
        }
        schedule.extend(std::iter::repeat_n(current_salary, MONTHS_PER_YEAR));
    }

    schedule
}

pub fn generate_investment_schedule(
    salary_schedule: &[f64],
    investment_rate_pct: f64,
) -> Vec<f64> {
    let rate = investment_rate_pct / 100.0;
    salary_schedule.iter().map(|salary| salary * rate).collect()
}

pub fn average_contribution(schedule: &[f64]) -> f64 {
    if schedule.is_empty() {
        return 0.0;
    }
    schedule.iter().sum::<f64>() / schedule.len() as f64
}

/// `None` for a zero raise, which is no milestone at all.
pub fn milestone_label(raise: f64) -> Option<String> {
    (raise != 0.0).then(|| format!("+{:.0}% raise", raise * 100.0))
}

pub fn salary_table_rows(
    salary_schedule: &[f64],
    investment_schedule: &[f64],
    start_age: u32,
    milestones: &Milestones,
) -> Vec<SalaryScheduleRow> {
    salary_schedule
        .chunks(MONTHS_PER_YEAR)
        .zip(investment_schedule.chunks(MONTHS_PER_YEAR))
        .enumerate()
        .map(|(year, (salary, investment))| {
            let year = year as u32;
            let monthly_contribution = investment[0];
            SalaryScheduleRow {
                year: year + 1,
                age: start_age + year,
                monthly_salary: salary[0],
                monthly_contribution,
                annual_contribution: monthly_contribution * MONTHS_PER_YEAR as f64,
                milestone: milestones.get(&year).and_then(|raise| milestone_label(*raise)),
            }
        })
        .collect()
}
