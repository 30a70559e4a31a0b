//! Discrete per-bar trading signals.
//!
//! Every strategy reduces its indicator series to one [`Signal`] per bar.
//! The numeric encoding (+1 buy, 0 hold, -1 sell) is kept so signal columns
//! can be written to CSV and compared with the historical reports.

use serde::{Deserialize, Serialize};

/// Per-bar discrete trading decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    /// Open a long position.
    Buy,
    /// Do nothing.
    #[default]
    Hold,
    /// Close an open long position.
    Sell,
}

impl Signal {
    /// Returns the numeric encoding of the signal.
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Hold => 0,
            Self::Sell => -1,
        }
    }

    /// Decodes a numeric signal value.
    ///
    /// Returns `None` for anything other than -1, 0 or 1.
    #[must_use]
    pub const fn from_i8(value: i8) -> Option<Self> {
        match value {
            1 => Some(Self::Buy),
            0 => Some(Self::Hold),
            -1 => Some(Self::Sell),
            _ => None,
        }
    }

    /// Returns true for buy and sell signals.
    #[must_use]
    pub const fn is_trade(self) -> bool {
        !matches!(self, Self::Hold)
    }

    /// Combines a buy condition with a sell condition the way the
    /// strategies do: a sell overrides a buy on the same bar.
    #[must_use]
    pub const fn from_conditions(buy: bool, sell: bool) -> Self {
        if sell {
            Self::Sell
        } else if buy {
            Self::Buy
        } else {
            Self::Hold
        }
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.as_i8()
    }
}

impl TryFrom<i8> for Signal {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Self::from_i8(value).ok_or_else(|| format!("invalid signal value: {value}"))
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_encoding() {
        assert_eq!(Signal::Buy.as_i8(), 1);
        assert_eq!(Signal::Hold.as_i8(), 0);
        assert_eq!(Signal::Sell.as_i8(), -1);
        assert_eq!(Signal::from_i8(-1), Some(Signal::Sell));
        assert_eq!(Signal::from_i8(2), None);
    }

    #[test]
    fn test_sell_overrides_buy() {
        assert_eq!(Signal::from_conditions(true, true), Signal::Sell);
        assert_eq!(Signal::from_conditions(true, false), Signal::Buy);
        assert_eq!(Signal::from_conditions(false, false), Signal::Hold);
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&vec![Signal::Buy, Signal::Hold, Signal::Sell]).unwrap();
        assert_eq!(json, "[1,0,-1]");

        let parsed: Vec<Signal> = serde_json::from_str("[-1,1]").unwrap();
        assert_eq!(parsed, vec![Signal::Sell, Signal::Buy]);
        assert!(serde_json::from_str::<Signal>("3").is_err());
    }
}
