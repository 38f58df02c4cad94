mod analytics;
mod engine;
mod ensemble;
mod error;
mod orchestrator;
mod rng;
mod schedule;
mod types;

pub use analytics::{
    annualized_return_pct, headline_stats, pct_or_zero, summarize, total_return_series,
    trailing_12m_series,
};
pub use engine::simulate_growth;
pub use ensemble::{MAX_ENSEMBLE_PATHS, run_ensemble};
pub use error::{SimError, SimResult};
pub use orchestrator::{
    ChartSeries, HISTORY_CAPACITY, Orchestrator, RunOutcome, RunRequest, SalaryTable,
    chart_series, point_title,
};
pub use rng::{BoxMuller, NormalSampler};
pub use schedule::{
    BuiltContributions, ContributionPlan, SalaryGrowthPlan, generate_investment_schedule,
    generate_salary_schedule, milestone_label, salary_table_rows, standard_milestones,
};
pub use types::{
    ContributionSource, DEFAULT_MEAN_REVERSION_STRENGTH, EnsembleBand, Granularity,
    HeadlineStats, INITIAL_SHARE_PRICE, MAX_TOTAL_YEARS, MONTHS_PER_YEAR, MeanReversion,
    Milestones, MonthlySnapshot, SalaryScheduleRow, SimulationConfig, SummaryRow, Trajectory,
};
