use super::types::{Granularity, HeadlineStats, MONTHS_PER_YEAR, SummaryRow, Trajectory};

pub fn pct_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

pub fn total_return_series(trajectory: &Trajectory) -> Vec<f64> {
    trajectory
        .snapshots
        .iter()
        .map(|s| pct_or_zero(s.balance - s.total_invested, s.total_invested))
        .collect()
}

/// Market return over the trailing 12 months with the year's contributions
/// taken out. `None` for the first 12 snapshots.
pub fn trailing_12m_series(trajectory: &Trajectory) -> Vec<Option<f64>> {
    let snapshots = &trajectory.snapshots;
    (0..snapshots.len())
        .map(|i| {
            let prev = snapshots.get(i.checked_sub(MONTHS_PER_YEAR)?)?;
            let current = &snapshots[i];
            let contributed = current.total_invested - prev.total_invested;
            Some(pct_or_zero(
                current.balance - prev.balance - contributed,
                prev.balance,
            ))
        })
        .collect()
}

pub fn annualized_return_pct(final_balance: f64, total_invested: f64, years: f64) -> f64 {
    if years <= 0.0 || total_invested <= 0.0 {
        return 0.0;
    }
    ((final_balance / total_invested).powf(1.0 / years) - 1.0) * 100.0
}

pub fn headline_stats(trajectory: &Trajectory) -> HeadlineStats {
    let total_invested = trajectory.final_total_invested();
    let final_value = trajectory.final_balance();
    let total_gain = final_value - total_invested;

    HeadlineStats {
        total_invested,
        final_value,
        total_gain,
        total_gain_pct: pct_or_zero(total_gain, total_invested),
        annualized_return_pct: annualized_return_pct(
            final_value,
            total_invested,
            trajectory.years(),
        ),
    }
}

/// The starting balance counts as a contribution of the first period, whose
/// opening balance is therefore zero.
pub fn summarize(
    trajectory: &Trajectory,
    granularity: Granularity,
    start_age: u32,
) -> Vec<SummaryRow> {
    let period_len = match granularity {
        Granularity::Yearly => MONTHS_PER_YEAR,
        Granularity::Monthly => 1,
    };

    let mut rows = Vec::with_capacity(trajectory.len() / period_len);
    let mut opening_balance = 0.0;

    for (idx, period) in trajectory.snapshots.chunks(period_len).enumerate() {
        let Some(last) = period.last() else {
            continue;
        };

        let mut contribution: f64 = period.iter().map(|s| s.invested).sum();
        if idx == 0 {
            contribution += trajectory.starting_balance;
        }

        let period_return = last.balance - opening_balance - contribution;
        let total_return = last.balance - last.total_invested;
        let label = match granularity {
            Granularity::Yearly => format!("Age {}", start_age + idx as u32 + 1),
            Granularity::Monthly => format!("Month {}", last.month),
        };

        rows.push(SummaryRow {
            period: label,
            contribution,
            period_return,
            period_return_pct: pct_or_zero(period_return, opening_balance + contribution),
            total_invested: last.total_invested,
            value: last.balance,
            total_return,
            total_return_pct: pct_or_zero(total_return, last.total_invested),
        });

        opening_balance = last.balance;
    }

    rows
}

pub fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
