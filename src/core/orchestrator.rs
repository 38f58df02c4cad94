use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use super::analytics::{headline_stats, summarize, total_return_series, trailing_12m_series};
use super::engine::simulate_growth;
use super::ensemble::run_ensemble;
use super::error::SimResult;
use super::rng::{BoxMuller, derive_seed};
use super::schedule::{ContributionPlan, average_contribution, salary_table_rows};
use super::types::{
    ContributionSource, EnsembleBand, Granularity, HeadlineStats, INITIAL_SHARE_PRICE,
    MONTHS_PER_YEAR, MeanReversion, SalaryScheduleRow, SimulationConfig, SummaryRow, Trajectory,
};

pub const HISTORY_CAPACITY: usize = 10;

const RUN_STREAM: u64 = 0x52;

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub plan: ContributionPlan,
    pub annual_return_pct: f64,
    pub annual_vol_pct: f64,
    pub total_years: u32,
    pub starting_balance: f64,
    pub start_age: u32,
    pub mean_reversion: Option<MeanReversion>,
    pub include_benchmark: bool,
    pub granularity: Granularity,
    pub ensemble_paths: Option<u32>,
    /// Base seed; `None` draws a fresh seed from OS entropy on every run.
    pub seed: Option<u64>,
}

impl RunRequest {
    /// Whether a trace produced under `other` is still comparable with this one.
    /// The table granularity is a view toggle and does not count.
    fn same_inputs(&self, other: &RunRequest) -> bool {
        RunRequest {
            granularity: other.granularity,
            ..self.clone()
        } == *other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub months: Vec<u32>,
    pub age_ticks: Vec<Option<u32>>,
    pub point_titles: Vec<String>,
    pub balance: Vec<f64>,
    pub invested: Vec<f64>,
    pub benchmark: Option<Vec<f64>>,
    pub share_price_index: Vec<f64>,
    pub total_return_pct: Vec<f64>,
    pub trailing_12m_pct: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryTable {
    pub rows: Vec<SalaryScheduleRow>,
    pub average_monthly_contribution: f64,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub seed: u64,
    pub trajectory: Trajectory,
    pub benchmark: Option<Trajectory>,
    pub stats: HeadlineStats,
    pub chart: ChartSeries,
    pub rows: Vec<SummaryRow>,
    pub salary: Option<SalaryTable>,
    pub history: Vec<Vec<f64>>,
    pub ensemble: Option<EnsembleBand>,
}

/// History only grows across consecutive runs with unchanged inputs; any
/// input change empties it, since older traces are no longer comparable.
#[derive(Debug, Default)]
pub struct Orchestrator {
    last_request: Option<RunRequest>,
    last_balance_series: Option<Vec<f64>>,
    history: VecDeque<Vec<f64>>,
    rerolls: u32,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> impl Iterator<Item = &Vec<f64>> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.last_balance_series = None;
        self.last_request = None;
        self.rerolls = 0;
    }

    pub fn run(&mut self, request: &RunRequest) -> SimResult<RunOutcome> {
        let built = request.plan.build(request.total_years)?;
        let config = SimulationConfig {
            contribution: built.source,
            annual_return_pct: request.annual_return_pct,
            annual_vol_pct: request.annual_vol_pct,
            total_years: request.total_years,
            starting_balance: request.starting_balance,
            mean_reversion: request.mean_reversion,
        };
        config.validate()?;

        let unchanged = self
            .last_request
            .as_ref()
            .is_some_and(|last| last.same_inputs(request));
        let rerolls = if unchanged { self.rerolls + 1 } else { 0 };
        let seed = match request.seed {
            Some(base) => derive_seed(base, RUN_STREAM, rerolls),
            None => rand::random(),
        };

        let mut sampler = BoxMuller::seeded(seed);
        let trajectory = simulate_growth(&config, &mut sampler)?;
        let benchmark = if request.include_benchmark {
            Some(simulate_growth(&config.as_benchmark(), &mut sampler)?)
        } else {
            None
        };
        let ensemble = match request.ensemble_paths {
            Some(paths) => Some(run_ensemble(&config, paths, seed)?),
            None => None,
        };

        let salary = match (&request.plan, &built.salary_schedule, &config.contribution) {
            (
                ContributionPlan::SalaryGrowth(plan),
                Some(salary),
                ContributionSource::Schedule(contributions),
            ) => Some(SalaryTable {
                rows: salary_table_rows(salary, contributions, request.start_age, &plan.milestones),
                average_monthly_contribution: average_contribution(contributions),
            }),
            _ => None,
        };

        let chart = chart_series(&trajectory, benchmark.as_ref(), request.start_age);
        let stats = headline_stats(&trajectory);
        let rows = summarize(&trajectory, request.granularity, request.start_age);

        if unchanged {
            if let Some(previous) = self.last_balance_series.take() {
                if self.history.len() == HISTORY_CAPACITY {
                    self.history.pop_front();
                }
                self.history.push_back(previous);
            }
        } else {
            self.history.clear();
        }
        self.last_balance_series = Some(chart.balance.clone());
        self.last_request = Some(request.clone());
        self.rerolls = rerolls;

        debug!(
            months = trajectory.len(),
            volatility = request.annual_vol_pct,
            benchmark = benchmark.is_some(),
            history = self.history.len(),
            seed,
            "projection complete"
        );

        Ok(RunOutcome {
            seed,
            trajectory,
            benchmark,
            stats,
            chart,
            rows,
            salary,
            history: self.history.iter().cloned().collect(),
            ensemble,
        })
    }
}

pub fn point_title(month: u32) -> String {
    if month == 0 {
        return "Start".to_string();
    }
    let per_year = MONTHS_PER_YEAR as u32;
    format!("{} y {} m", month / per_year, month % per_year)
}

pub fn chart_series(
    trajectory: &Trajectory,
    benchmark: Option<&Trajectory>,
    start_age: u32,
) -> ChartSeries {
    let points = trajectory.len() + 1;
    let per_year = MONTHS_PER_YEAR as u32;
    let months: Vec<u32> = (0..points as u32).collect();

    let with_start = |start: f64, values: Vec<f64>| {
        let mut series = Vec::with_capacity(points);
        series.push(start);
        series.extend(values);
        series
    };

    let mut trailing_12m_pct = Vec::with_capacity(points);
    trailing_12m_pct.push(None);
    trailing_12m_pct.extend(trailing_12m_series(trajectory));

    ChartSeries {
        age_ticks: months
            .iter()
            .map(|m| (m % per_year == 0).then(|| start_age + m / per_year))
            .collect(),
        point_titles: months.iter().map(|m| point_title(*m)).collect(),
        balance: with_start(trajectory.starting_balance, trajectory.balances()),
        invested: with_start(
            trajectory.starting_balance,
            trajectory.snapshots.iter().map(|s| s.total_invested).collect(),
        ),
        benchmark: benchmark.map(|b| with_start(b.starting_balance, b.balances())),
        share_price_index: with_start(
            INITIAL_SHARE_PRICE,
            trajectory.snapshots.iter().map(|s| s.share_price).collect(),
        ),
        total_return_pct: with_start(0.0, total_return_series(trajectory)),
        trailing_12m_pct,
        months,
    }
}
