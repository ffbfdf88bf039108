//! Signal — the per-bar trading instruction stamped by the strategy.

use serde::{Deserialize, Serialize};

/// Directional instruction attached to a bar.
///
/// Serialized as the integer `+1` / `-1` / `0`, which is also how signals
/// appear in CSV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }
}

impl TryFrom<i8> for Signal {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Signal::Buy),
            -1 => Ok(Signal::Sell),
            0 => Ok(Signal::Hold),
            other => Err(format!("signal must be one of -1, 0, 1 (got {other})")),
        }
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.as_i8()
    }
}
