//! Performance metrics — pure functions over a run's total-value series.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Functions return `MetricsError` instead of a sentinel when the input cannot
//! support the statistic; the aggregate `PerformanceMetrics` decides which of
//! those are fatal and which become `None`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crosslab_core::domain::{Trade, TradeSide};

/// Trading days used to annualize returns and volatility.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Annual risk-free rate used by the Sharpe ratio.
pub const RISK_FREE_RATE: f64 = 0.02;

/// Errors from metric computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("{metric} needs at least {needed} values (got {got})")]
    InsufficientData {
        metric: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("daily returns have zero volatility")]
    ZeroVolatility,

    #[error("value {value} at index {index} is not a positive finite number")]
    NonPositiveValue { index: usize, value: f64 },
}

/// Annualization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub trading_days_per_year: u32,
    pub risk_free_rate: f64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            risk_free_rate: RISK_FREE_RATE,
        }
    }
}

/// Aggregate performance metrics for a single backtest run.
///
/// `annualized_return` is `None` for a single-snapshot run; `sharpe` is `None`
/// when the series is too short or has zero volatility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: Option<f64>,
    pub sharpe: Option<f64>,
    pub max_drawdown: f64,
    pub round_trips: usize,
    pub win_rate: f64,
    pub total_fees: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from a total-value series and the trade log.
    pub fn compute(
        equity_curve: &[f64],
        trades: &[Trade],
        settings: &MetricsSettings,
    ) -> Result<Self, MetricsError> {
        let total_return = total_return(equity_curve)?;
        let max_drawdown = max_drawdown(equity_curve)?;

        let annualized_return =
            match annualized_return(equity_curve, settings.trading_days_per_year) {
                Ok(v) => Some(v),
                Err(MetricsError::InsufficientData { .. }) => None,
                Err(e) => return Err(e),
            };

        let sharpe = match sharpe_ratio(
            equity_curve,
            settings.risk_free_rate,
            settings.trading_days_per_year,
        ) {
            Ok(v) => Some(v),
            Err(MetricsError::InsufficientData { .. } | MetricsError::ZeroVolatility) => None,
            Err(e) => return Err(e),
        };

        let pnls = round_trip_pnls(trades);
        Ok(Self {
            total_return,
            annualized_return,
            sharpe,
            max_drawdown,
            round_trips: pnls.len(),
            win_rate: win_rate(&pnls),
            total_fees: trades.iter().map(|t| t.fees).sum(),
        })
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: V[n-1] / V[0] - 1.
pub fn total_return(equity_curve: &[f64]) -> Result<f64, MetricsError> {
    check_series(equity_curve, "total return", 1)?;
    let initial = equity_curve[0];
    let final_value = equity_curve[equity_curve.len() - 1];
    Ok(final_value / initial - 1.0)
}

/// Annualized return: (1 + total_return)^(days_per_year / n) - 1.
///
/// `n` counts snapshots, not calendar days.
pub fn annualized_return(equity_curve: &[f64], days_per_year: u32) -> Result<f64, MetricsError> {
    check_series(equity_curve, "annualized return", 2)?;
    let tr = total_return(equity_curve)?;
    let n = equity_curve.len() as f64;
    Ok((1.0 + tr).powf(days_per_year as f64 / n) - 1.0)
}

/// Annualized Sharpe ratio.
///
/// Sharpe = (annualized_return - rf) / (stdev(daily returns) * sqrt(days_per_year)),
/// with the sample standard deviation over `n - 1` daily returns.
pub fn sharpe_ratio(
    equity_curve: &[f64],
    risk_free_rate: f64,
    days_per_year: u32,
) -> Result<f64, MetricsError> {
    check_series(equity_curve, "sharpe ratio", 3)?;
    let returns = daily_returns(equity_curve);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return Err(MetricsError::ZeroVolatility);
    }
    let annual_volatility = std * (days_per_year as f64).sqrt();
    let annual_return = annualized_return(equity_curve, days_per_year)?;
    Ok((annual_return - risk_free_rate) / annual_volatility)
}

/// Maximum drawdown as a non-negative fraction (e.g., 0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below its running peak.
pub fn max_drawdown(equity_curve: &[f64]) -> Result<f64, MetricsError> {
    check_series(equity_curve, "max drawdown", 1)?;
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        let dd = (peak - eq) / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    Ok(max_dd)
}

/// Net P&L of each completed buy→sell round trip, fees included.
///
/// A trailing buy without a matching sell is an open position and is skipped.
pub fn round_trip_pnls(trades: &[Trade]) -> Vec<f64> {
    let mut pnls = Vec::new();
    let mut entry: Option<&Trade> = None;

    for trade in trades {
        match trade.side {
            TradeSide::Buy => entry = Some(trade),
            TradeSide::Sell => {
                if let Some(buy) = entry.take() {
                    pnls.push(trade.cash_flow() + buy.cash_flow());
                }
            }
        }
    }
    pnls
}

/// Fraction of round trips with positive net P&L.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let winners = pnls.iter().filter(|&&p| p > 0.0).count();
    winners as f64 / pnls.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple daily returns: r[i] = V[i] / V[i-1] - 1 for i = 1..n-1.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Sample standard deviation (n - 1 denominator). 0.0 for fewer than 2 values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn check_series(values: &[f64], metric: &'static str, needed: usize) -> Result<(), MetricsError> {
    if values.len() < needed {
        return Err(MetricsError::InsufficientData {
            metric,
            needed,
            got: values.len(),
        });
    }
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v <= 0.0)
    {
        Some((index, &value)) => Err(MetricsError::NonPositiveValue { index, value }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn assert_approx(actual: f64, expected: f64, eps: f64) {
        assert!(
            (actual - expected).abs() < eps,
            "actual={actual}, expected={expected}"
        );
    }

    fn trade(day: u32, side: TradeSide, price: f64, shares: u64, fees: f64) -> Trade {
        Trade::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            side,
            price,
            shares,
            fees,
        )
    }

    #[test]
    fn total_return_compounds() {
        assert_approx(total_return(&[100.0, 110.0, 121.0]).unwrap(), 0.21, 1e-12);
        assert_approx(total_return(&[100.0]).unwrap(), 0.0, 1e-12);
    }

    #[test]
    fn total_return_empty_is_error() {
        assert!(matches!(
            total_return(&[]),
            Err(MetricsError::InsufficientData { needed: 1, got: 0, .. })
        ));
    }

    #[test]
    fn annualized_return_uses_snapshot_count() {
        // 252 snapshots with a 10% total return → exactly 10% annualized.
        let mut curve = vec![100.0; 252];
        curve[251] = 110.0;
        assert_approx(annualized_return(&curve, 252).unwrap(), 0.10, 1e-12);

        // Half a year at 10% → (1.1)^2 - 1.
        let mut half = vec![100.0; 126];
        half[125] = 110.0;
        assert_approx(annualized_return(&half, 252).unwrap(), 0.21, 1e-12);
    }

    #[test]
    fn annualized_return_needs_two_values() {
        assert!(matches!(
            annualized_return(&[100.0], 252),
            Err(MetricsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn max_drawdown_from_peak() {
        assert_approx(max_drawdown(&[100.0, 120.0, 90.0, 90.0]).unwrap(), 0.25, 1e-12);
    }

    #[test]
    fn max_drawdown_zero_for_rising_series() {
        assert_eq!(max_drawdown(&[100.0, 101.0, 101.0, 130.0]).unwrap(), 0.0);
    }

    #[test]
    fn sharpe_matches_hand_calculation() {
        let curve = [100.0, 102.0, 101.0, 104.0];
        let returns = daily_returns(&curve);
        let std = std_dev(&returns);
        let ann = (1.04_f64).powf(252.0 / 4.0) - 1.0;
        let expected = (ann - 0.02) / (std * 252.0_f64.sqrt());
        assert_approx(sharpe_ratio(&curve, 0.02, 252).unwrap(), expected, 1e-9);
    }

    #[test]
    fn sharpe_zero_volatility_is_error() {
        assert_eq!(
            sharpe_ratio(&[100.0, 100.0, 100.0], 0.02, 252),
            Err(MetricsError::ZeroVolatility)
        );
    }

    #[test]
    fn non_positive_value_is_rejected() {
        assert_eq!(
            total_return(&[100.0, 0.0]),
            Err(MetricsError::NonPositiveValue { index: 1, value: 0.0 })
        );
    }

    #[test]
    fn std_dev_is_sample() {
        // mean 2.5, squared deviations sum 5.0, / 3
        assert_approx(std_dev(&[1.0, 2.0, 3.0, 4.0]), (5.0_f64 / 3.0).sqrt(), 1e-12);
    }

    #[test]
    fn round_trips_pair_buys_with_sells() {
        let trades = vec![
            trade(2, TradeSide::Buy, 10.0, 100, 5.0),
            trade(3, TradeSide::Sell, 11.0, 100, 6.0),
            trade(4, TradeSide::Buy, 11.0, 100, 5.0),
            trade(5, TradeSide::Sell, 10.0, 100, 6.0),
            trade(8, TradeSide::Buy, 10.0, 100, 5.0),
        ];
        let pnls = round_trip_pnls(&trades);
        assert_eq!(pnls.len(), 2);
        assert_approx(pnls[0], 1100.0 - 6.0 - 1000.0 - 5.0, 1e-9);
        assert_approx(pnls[1], 1000.0 - 6.0 - 1100.0 - 5.0, 1e-9);
        assert_approx(win_rate(&pnls), 0.5, 1e-12);
    }

    #[test]
    fn compute_flat_series_has_no_sharpe() {
        let m = PerformanceMetrics::compute(&[100.0; 10], &[], &MetricsSettings::default()).unwrap();
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.annualized_return, Some(0.0));
        assert_eq!(m.sharpe, None);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.round_trips, 0);
    }

    #[test]
    fn compute_single_snapshot() {
        let m = PerformanceMetrics::compute(&[100.0], &[], &MetricsSettings::default()).unwrap();
        assert_eq!(m.annualized_return, None);
        assert_eq!(m.sharpe, None);
    }

    #[test]
    fn compute_sums_fees() {
        let trades = vec![
            trade(2, TradeSide::Buy, 10.0, 100, 5.0),
            trade(3, TradeSide::Sell, 11.0, 100, 6.1),
        ];
        let m = PerformanceMetrics::compute(&[1000.0, 1100.0, 1089.0], &trades, &MetricsSettings::default())
            .unwrap();
        assert_approx(m.total_fees, 11.1, 1e-12);
        assert_eq!(m.round_trips, 1);
        assert_eq!(m.win_rate, 1.0);
    }

    #[test]
    fn penny_position_with_fee_floor_still_scores() {
        use crosslab_core::domain::{Bar, Signal};
        use crosslab_core::engine::{run_simulation, EngineConfig};

        let bar = |day: u32, price: f64, signal: Signal| Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: price,
            high: None,
            low: None,
            close: price,
            volume: 1e6,
            signal,
        };
        let bars = [
            bar(2, 0.01, Signal::Buy),
            bar(3, 0.011, Signal::Sell),
            bar(4, 0.012, Signal::Hold),
        ];
        let result = run_simulation(&bars, &EngineConfig::canonical(10.0, "sh.600000")).unwrap();

        let m = PerformanceMetrics::compute(
            &result.equity_curve(),
            result.trades(),
            &MetricsSettings::default(),
        )
        .unwrap();
        assert!(m.max_drawdown >= 0.0);
        assert_eq!(m.round_trips, 0);
    }
}
