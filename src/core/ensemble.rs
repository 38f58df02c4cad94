use tracing::debug;

use super::analytics::percentile;
use super::engine::simulate_growth;
use super::error::{SimResult, invalid};
use super::rng::{BoxMuller, derive_seed};
use super::types::{EnsembleBand, SimulationConfig};

const ENSEMBLE_STREAM: u64 = 0xE5;

pub const MAX_ENSEMBLE_PATHS: u32 = 1_000;

pub fn run_ensemble(
    config: &SimulationConfig,
    paths: u32,
    base_seed: u64,
) -> SimResult<EnsembleBand> {
    if !(1..=MAX_ENSEMBLE_PATHS).contains(&paths) {
        return Err(invalid(
            "ensemble_paths",
            format!("must be between 1 and {MAX_ENSEMBLE_PATHS}, got {paths}"),
        ));
    }
    config.validate()?;

    let months = config.total_months();
    let mut by_month: Vec<Vec<f64>> = (0..=months)
        .map(|_| Vec::with_capacity(paths as usize))
        .collect();

    for path_id in 0..paths {
        let mut sampler = BoxMuller::seeded(derive_seed(base_seed, ENSEMBLE_STREAM, path_id));
        let trajectory = simulate_growth(config, &mut sampler)?;

        by_month[0].push(config.starting_balance);
        for snapshot in &trajectory.snapshots {
            by_month[snapshot.month as usize].push(snapshot.balance);
        }
    }
    debug!(paths, months, "ensemble complete");

    let mut p10_balance = Vec::with_capacity(months + 1);
    let mut median_balance = Vec::with_capacity(months + 1);
    let mut p90_balance = Vec::with_capacity(months + 1);
    for balances in &mut by_month {
        p10_balance.push(percentile(balances, 10.0));
        median_balance.push(percentile(balances, 50.0));
        p90_balance.push(percentile(balances, 90.0));
    }

    Ok(EnsembleBand {
        paths,
        p10_final: p10_balance[months],
        median_final: median_balance[months],
        p90_final: p90_balance[months],
        p10_balance,
        median_balance,
        p90_balance,
    })
}
