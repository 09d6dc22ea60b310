use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Injection frequency of a protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Frequency {
    /// Every day
    Ed,
    /// Every other day
    Eod,
    /// Monday, Wednesday, Friday
    ThreePerWeek,
    /// Monday, Thursday
    TwicePerWeek,
    Weekly,
    Biweekly,
}

const ALL: [Frequency; 6] = [
    Frequency::Ed,
    Frequency::Eod,
    Frequency::ThreePerWeek,
    Frequency::TwicePerWeek,
    Frequency::Weekly,
    Frequency::Biweekly,
];

impl Frequency {
    /// Parse a frequency identifier. Unknown identifiers fall back to the
    /// nearest known frequency when an injections-per-week count can be
    /// read from them, and to weekly otherwise.
    pub fn from_id(id: &str) -> Self {
        let normalized: String = id
            .replace('×', "x")
            .to_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "ED" | "DAILY" | "7XW" | "7XWEEK" => Frequency::Ed,
            "EOD" => Frequency::Eod,
            "3XW" | "3XWEEK" => Frequency::ThreePerWeek,
            "2XW" | "2XWEEK" => Frequency::TwicePerWeek,
            "1XW" | "1XWEEK" | "WEEKLY" => Frequency::Weekly,
            "1X2W" | "1X2WEEK" | "1X2WEEKS" | "E2W" | "BIWEEKLY" => Frequency::Biweekly,
            _ => {
                let count: String = normalized.chars().take_while(|c| c.is_ascii_digit()).collect();
                match count.parse::<f64>() {
                    Ok(per_week) => Self::nearest(per_week),
                    Err(_) => Frequency::Weekly,
                }
            }
        }
    }

    /// Known frequency whose injections-per-week is closest to `per_week`.
    pub fn nearest(per_week: f64) -> Self {
        ALL.iter()
            .copied()
            .min_by(|a, b| {
                let da = (a.injections_per_week() - per_week).abs();
                let db = (b.injections_per_week() - per_week).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(Frequency::Weekly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Ed => "ED",
            Frequency::Eod => "EOD",
            Frequency::ThreePerWeek => "3xW",
            Frequency::TwicePerWeek => "2xW",
            Frequency::Weekly => "1xW",
            Frequency::Biweekly => "1x2W",
        }
    }

    pub fn injections_per_week(&self) -> f64 {
        match self {
            Frequency::Ed => 7.0,
            Frequency::Eod => 3.5,
            Frequency::ThreePerWeek => 3.0,
            Frequency::TwicePerWeek => 2.0,
            Frequency::Weekly => 1.0,
            Frequency::Biweekly => 0.5,
        }
    }

    /// Nominal spacing between injections in days.
    pub fn interval_days(&self) -> f64 {
        match self {
            Frequency::Ed => 1.0,
            Frequency::Eod => 2.0,
            Frequency::ThreePerWeek => 7.0 / 3.0,
            Frequency::TwicePerWeek => 3.5,
            Frequency::Weekly => 7.0,
            Frequency::Biweekly => 14.0,
        }
    }

    /// Length of one rotation period in weeks. EOD and biweekly need two
    /// weeks to hold a whole number of injections.
    pub fn period_weeks(&self) -> u32 {
        match self {
            Frequency::Eod | Frequency::Biweekly => 2,
            _ => 1,
        }
    }

    pub fn injections_per_period(&self) -> usize {
        (self.injections_per_week() * self.period_weeks() as f64).round() as usize
    }

    /// Fixed injection weekdays, for frequencies tied to the calendar week.
    pub fn fixed_weekdays(&self) -> Option<&'static [Weekday]> {
        match self {
            Frequency::ThreePerWeek => Some(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]),
            Frequency::TwicePerWeek => Some(&[Weekday::Mon, Weekday::Thu]),
            _ => None,
        }
    }
}

impl From<String> for Frequency {
    fn from(id: String) -> Self {
        Frequency::from_id(&id)
    }
}

impl From<Frequency> for &'static str {
    fn from(frequency: Frequency) -> Self {
        frequency.as_str()
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
