//! Simple Moving Average (SMA).
//!
//! Rolling mean of close prices over a lookback window.
//! First valid value at index period-1.

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(Self {
            period,
            name: format!("sma_{period}"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// One value per input; NaN until the window is full or while a NaN
    /// close sits inside the window.
    pub fn compute(&self, closes: &[f64]) -> Vec<f64> {
        let n = closes.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let mut sum: f64 = closes[..self.period].iter().sum();
        result[self.period - 1] = sum / self.period as f64;

        for i in self.period..n {
            let leaving = closes[i - self.period];
            let entering = closes[i];
            sum = sum - leaving + entering;

            if !sum.is_finite() {
                // Rescan so a NaN that has left the window stops poisoning the sum.
                sum = closes[(i + 1 - self.period)..=i].iter().sum();
            }
            result[i] = sum / self.period as f64;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let result = Sma::new(5).unwrap().compute(&closes);

        assert_eq!(result.len(), 7);
        for (i, value) in result.iter().enumerate().take(4) {
            assert!(value.is_nan(), "expected NaN at index {i}");
        }
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let result = Sma::new(1).unwrap().compute(&[100.0, 200.0, 300.0]);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_propagation() {
        let closes = [10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0];
        let result = Sma::new(3).unwrap().compute(&closes);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_name_and_period() {
        let sma = Sma::new(60).unwrap();
        assert_eq!(sma.name(), "sma_60");
        assert_eq!(sma.period(), 60);
    }

    #[test]
    fn sma_zero_period_rejected() {
        assert!(matches!(Sma::new(0), Err(ConfigError::ZeroPeriod)));
    }

    #[test]
    fn sma_too_few_bars() {
        let result = Sma::new(5).unwrap().compute(&[10.0, 11.0]);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
