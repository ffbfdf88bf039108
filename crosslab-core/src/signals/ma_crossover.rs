//! Moving average crossover signal — golden cross and death cross detection.
//!
//! Emits `Buy` on the bar where the short SMA moves above the long SMA
//! (golden cross) and `Sell` on the bar where it moves below (death cross).
//! Every other bar, including all warmup bars, is `Hold`.

use crate::domain::{Bar, RawBar, Signal};
use crate::error::ConfigError;
use crate::indicators::Sma;

/// Short/long SMA crossover.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    short: Sma,
    long: Sma,
}

impl MaCrossover {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, ConfigError> {
        if short_window == 0 || long_window <= short_window {
            return Err(ConfigError::InvalidWindows {
                short: short_window,
                long: long_window,
            });
        }
        Ok(Self {
            short: Sma::new(short_window)?,
            long: Sma::new(long_window)?,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short.period()
    }

    pub fn long_window(&self) -> usize {
        self.long.period()
    }

    pub fn name(&self) -> String {
        format!("{}_x_{}", self.short.name(), self.long.name())
    }

    /// Compute one signal per close.
    pub fn signals(&self, closes: &[f64]) -> Vec<Signal> {
        let fast = self.short.compute(closes);
        let slow = self.long.compute(closes);

        (0..closes.len())
            .map(|i| {
                if i == 0 {
                    return Signal::Hold;
                }
                crossover(fast[i - 1], slow[i - 1], fast[i], slow[i])
            })
            .collect()
    }

    /// Attach a crossover signal to each raw bar.
    pub fn stamp(&self, raw: &[RawBar]) -> Vec<Bar> {
        let closes: Vec<f64> = raw.iter().map(|b| b.close).collect();
        raw.iter()
            .zip(self.signals(&closes))
            .map(|(bar, signal)| Bar::from_raw(bar, signal))
            .collect()
    }
}

fn crossover(fast_prev: f64, slow_prev: f64, fast_cur: f64, slow_cur: f64) -> Signal {
    if fast_cur.is_nan() || slow_cur.is_nan() || fast_prev.is_nan() || slow_prev.is_nan() {
        return Signal::Hold;
    }
    if fast_cur > slow_cur && fast_prev <= slow_prev {
        Signal::Buy
    } else if fast_cur < slow_cur && fast_prev >= slow_prev {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn rejects_inverted_windows() {
        assert!(MaCrossover::new(20, 10).is_err());
        assert!(MaCrossover::new(10, 10).is_err());
        assert!(MaCrossover::new(0, 10).is_err());
        assert!(MaCrossover::new(20, 60).is_ok());
    }

    #[test]
    fn golden_then_death_cross() {
        // Falling, then rising (golden cross), then falling again (death cross).
        let closes = [5.0, 4.0, 3.0, 2.0, 3.0, 5.0, 7.0, 6.0, 3.0, 1.0];
        let signals = MaCrossover::new(2, 4).unwrap().signals(&closes);

        assert_eq!(signals.len(), closes.len());
        let buys: Vec<usize> = signals
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Signal::Buy)
            .map(|(i, _)| i)
            .collect();
        let sells: Vec<usize> = signals
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Signal::Sell)
            .map(|(i, _)| i)
            .collect();
        // sma2[4]=2.5 vs sma4[4]=3.0; sma2[5]=4.0 vs sma4[5]=3.25 → cross at 5
        assert_eq!(buys, vec![5]);
        // sma2[8]=4.5 vs sma4[8]=5.25; sma2[7]=6.5 vs sma4[7]=5.25 → cross at 8
        assert_eq!(sells, vec![8]);
    }

    #[test]
    fn warmup_bars_hold() {
        let closes = [1.0, 2.0, 3.0];
        let signals = MaCrossover::new(2, 5).unwrap().signals(&closes);
        assert!(signals.iter().all(|s| *s == Signal::Hold));
    }

    #[test]
    fn stamp_preserves_bars() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let raw: Vec<RawBar> = [5.0, 4.0, 3.0, 2.0, 3.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, &close)| RawBar {
                date: base + chrono::Duration::days(i as i64),
                code: "sh.600000".into(),
                open: close,
                high: None,
                low: None,
                close,
                volume: 100.0,
            })
            .collect();
        let bars = MaCrossover::new(2, 4).unwrap().stamp(&raw);
        assert_eq!(bars.len(), raw.len());
        assert_eq!(bars[5].signal, Signal::Buy);
        assert_eq!(bars[3].date, raw[3].date);
    }

    #[test]
    fn name_combines_windows() {
        assert_eq!(MaCrossover::new(20, 60).unwrap().name(), "sma_20_x_sma_60");
    }
}
