//! Input contract checks, run before the first bar is replayed.

use crate::domain::Bar;
use crate::error::DataError;

/// Reject empty, unsorted, duplicate-dated, or badly priced bar sequences.
pub fn validate_bars(bars: &[Bar]) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::Empty);
    }

    for (index, bar) in bars.iter().enumerate() {
        if !bar.has_valid_prices() {
            return Err(DataError::InvalidPrice {
                index,
                date: bar.date,
            });
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(DataError::InvalidVolume {
                index,
                date: bar.date,
                volume: bar.volume,
            });
        }
        if index > 0 {
            let previous = bars[index - 1].date;
            if bar.date == previous {
                return Err(DataError::DuplicateDate {
                    index,
                    date: bar.date,
                });
            }
            if bar.date < previous {
                return Err(DataError::Unsorted {
                    index,
                    date: bar.date,
                    previous,
                });
            }
        }
    }
    Ok(())
}
