use serde::Serialize;

const EPSILON: f64 = 1e-9;

/// Direction of a year-over-year cutoff change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
    /// No delta available (cutoff missing).
    Unknown,
}

impl Trend {
    /// Classifies a delta; magnitudes below `1e-9` count as flat.
    pub fn from_delta(delta: Option<f64>) -> Trend {
        match delta {
            None => Trend::Unknown,
            Some(d) if d > EPSILON => Trend::Up,
            Some(d) if d < -EPSILON => Trend::Down,
            Some(_) => Trend::Flat,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "",
            Trend::Unknown => "?",
        }
    }
}
