use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where position data is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Static mock positions file.
    #[default]
    Demo,
    /// Live brokerage positions.
    Live,
}

impl Mode {
    #[must_use]
    pub const fn from_demo_flag(demo: bool) -> Self {
        if demo {
            Self::Demo
        } else {
            Self::Live
        }
    }

    #[must_use]
    pub const fn is_demo(self) -> bool {
        matches!(self, Self::Demo)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "live" => Ok(Self::Live),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// One tradable instrument within an underlying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub name: String,
    pub quantity: i64,
    pub pnl: Decimal,
    pub delta: Decimal,
}

/// Legs grouped under their root instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Underlying {
    pub name: String,
    pub total_pnl: Decimal,
    pub total_pnl_pct: Decimal,
    pub legs: Vec<Leg>,
}

impl Underlying {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_pnl: Decimal::ZERO,
            total_pnl_pct: Decimal::ZERO,
            legs: Vec::new(),
        }
    }

    /// Appends a leg and folds its pnl into the running total.
    pub fn push_leg(&mut self, leg: Leg) {
        self.total_pnl += leg.pnl;
        self.legs.push(leg);
    }

    /// Sum of leg pnl, recomputed from the legs.
    #[must_use]
    pub fn legs_pnl(&self) -> Decimal {
        self.legs.iter().map(|l| l.pnl).sum()
    }
}
