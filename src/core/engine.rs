use tracing::{trace, warn};

use super::error::SimResult;
use super::rng::NormalSampler;
use super::types::{
    INITIAL_SHARE_PRICE, MONTHS_PER_YEAR, MeanReversion, MonthlySnapshot, SimulationConfig,
    Trajectory,
};

/// Drift targets the arithmetic mean: `ln(1 + r) - sigma^2 / 2` per year, so the
/// expected compounded value matches the requested return. The zero-volatility
/// path skips the log-normal draw and compounds at `(1 + r)^(1/12)` exactly.
#[derive(Debug, Clone, Copy)]
struct GrowthParams {
    annual_return: f64,
    monthly_drift: f64,
    monthly_std_dev: f64,
    deterministic_factor: f64,
    deterministic: bool,
}

impl GrowthParams {
    fn from_config(config: &SimulationConfig) -> Self {
        let annual_return = config.annual_return_pct / 100.0;
        let annual_vol = config.annual_vol_pct / 100.0;
        let annual_drift = (1.0 + annual_return).ln() - 0.5 * annual_vol * annual_vol;

        Self {
            annual_return,
            monthly_drift: annual_drift / MONTHS_PER_YEAR as f64,
            monthly_std_dev: annual_vol / (MONTHS_PER_YEAR as f64).sqrt(),
            deterministic_factor: (1.0 + annual_return).powf(1.0 / MONTHS_PER_YEAR as f64),
            deterministic: config.annual_vol_pct == 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Holdings {
    share_price: f64,
    total_shares: f64,
    total_invested: f64,
}

impl Holdings {
    fn opening(starting_balance: f64) -> Self {
        Self {
            share_price: INITIAL_SHARE_PRICE,
            total_shares: starting_balance / INITIAL_SHARE_PRICE,
            total_invested: starting_balance,
        }
    }

    fn step(&mut self, month: u32, growth_factor: f64, contribution: f64) -> MonthlySnapshot {
        self.share_price *= growth_factor;
        let shares_bought = contribution / self.share_price;
        self.total_shares += shares_bought;
        self.total_invested += contribution;

        MonthlySnapshot {
            month,
            monthly_return: growth_factor - 1.0,
            invested: contribution,
            total_invested: self.total_invested,
            balance: self.total_shares * self.share_price,
            share_price: self.share_price,
            shares_bought,
            total_shares: self.total_shares,
        }
    }
}

/// The config is validated before any month is simulated, so the result is
/// either a complete trajectory of `total_years * 12` snapshots or an error.
/// Non-finite balances from extreme inputs are propagated, not clamped.
pub fn simulate_growth<S: NormalSampler + ?Sized>(
    config: &SimulationConfig,
    sampler: &mut S,
) -> SimResult<Trajectory> {
    config.validate()?;

    let params = GrowthParams::from_config(config);
    let total_months = config.total_months();
    let reversion = config.mean_reversion.filter(|_| !params.deterministic);

    let mut holdings = Holdings::opening(config.starting_balance);
    let mut snapshots: Vec<MonthlySnapshot> = Vec::with_capacity(total_months);
    let mut drift_adjustment = 0.0;
    let mut reported_non_finite = false;

    for month in 1..=total_months {
        let contribution = config.contribution.amount_for(month - 1);

        if let Some(reversion) = reversion {
            if month > MONTHS_PER_YEAR && month % MONTHS_PER_YEAR == 1 {
                drift_adjustment = reversion_adjustment(
                    reversion,
                    &snapshots,
                    config.starting_balance,
                    params.annual_return,
                );
                trace!(month, drift_adjustment, "mean reversion drift adjustment");
            }
        }

        let growth_factor = if params.deterministic {
            params.deterministic_factor
        } else {
            sampler
                .sample(params.monthly_drift + drift_adjustment, params.monthly_std_dev)
                .exp()
        };

        let snapshot = holdings.step(month as u32, growth_factor, contribution);
        if !snapshot.balance.is_finite() && !reported_non_finite {
            warn!(month, balance = snapshot.balance, "non-finite balance in trajectory");
            reported_non_finite = true;
        }
        snapshots.push(snapshot);
    }

    Ok(Trajectory {
        starting_balance: config.starting_balance,
        snapshots,
    })
}

/// Drift correction for the 12 months after a completed year.
///
/// Called at the first month of a new year with every snapshot so far. The
/// realized return of the last completed year excludes that year's
/// contributions; no correction is made when the opening balance is not
/// positive.
fn reversion_adjustment(
    reversion: MeanReversion,
    snapshots: &[MonthlySnapshot],
    starting_balance: f64,
    expected_annual_return: f64,
) -> f64 {
    let Some(year_end) = snapshots.last() else {
        return 0.0;
    };
    let (open_balance, open_invested) = match snapshots.len().checked_sub(MONTHS_PER_YEAR + 1) {
        Some(idx) => (snapshots[idx].balance, snapshots[idx].total_invested),
        None => (starting_balance, starting_balance),
    };

    if open_balance <= 0.0 {
        return 0.0;
    }

    let contributions = year_end.total_invested - open_invested;
    let realized = (year_end.balance - open_balance - contributions) / open_balance;
    let deviation = expected_annual_return - realized;

    -reversion.strength * deviation / MONTHS_PER_YEAR as f64
}
