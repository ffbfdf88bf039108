//! Property tests for the performance metrics.

use crosslab_runner::metrics::{
    annualized_return, daily_returns, max_drawdown, sharpe_ratio, total_return, MetricsError,
};
use proptest::prelude::*;

fn arb_curve(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1_000_000.0_f64, 1..max_len)
}

proptest! {
    #[test]
    fn drawdown_is_a_fraction(curve in arb_curve(200)) {
        let dd = max_drawdown(&curve).unwrap();
        prop_assert!((0.0..1.0).contains(&dd));
    }

    #[test]
    fn drawdown_zero_when_non_decreasing(mut curve in arb_curve(200)) {
        curve.sort_by(|a, b| a.partial_cmp(b).unwrap());
        prop_assert_eq!(max_drawdown(&curve).unwrap(), 0.0);
    }

    #[test]
    fn total_return_matches_endpoints(curve in arb_curve(200)) {
        let tr = total_return(&curve).unwrap();
        let expected = curve[curve.len() - 1] / curve[0] - 1.0;
        prop_assert!((tr - expected).abs() < 1e-12);
    }

    #[test]
    fn one_year_of_snapshots_annualizes_to_total(curve in prop::collection::vec(50.0..150.0_f64, 252)) {
        let tr = total_return(&curve).unwrap();
        let ann = annualized_return(&curve, 252).unwrap();
        prop_assert!((tr - ann).abs() < 1e-9);
    }

    #[test]
    fn daily_returns_drop_first_snapshot(curve in arb_curve(200)) {
        prop_assert_eq!(daily_returns(&curve).len(), curve.len() - 1);
    }

    #[test]
    fn constant_series_has_zero_volatility(value in 1.0..1_000.0_f64, n in 3usize..100) {
        let curve = vec![value; n];
        prop_assert_eq!(sharpe_ratio(&curve, 0.02, 252), Err(MetricsError::ZeroVolatility));
    }
}
