use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PKError, PKResult};
use crate::models::InjectionSite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionStatus {
    Done,
    Missed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodySide {
    Left,
    Right,
}

/// What happened on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionRecord {
    pub date: NaiveDate,
    pub status: InjectionStatus,
    /// Time of day the injection was given, for done records
    #[serde(default)]
    pub time: Option<NaiveTime>,
    /// Device units actually injected
    #[serde(default)]
    pub units: Option<f64>,
    #[serde(default)]
    pub location: Option<InjectionSite>,
    #[serde(default)]
    pub side: Option<BodySide>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub miss_reason: Option<String>,
}

impl InjectionRecord {
    pub fn done(date: NaiveDate, time: NaiveTime, units: f64) -> Self {
        Self {
            date,
            status: InjectionStatus::Done,
            time: Some(time),
            units: Some(units),
            location: None,
            side: None,
            note: None,
            miss_reason: None,
        }
    }

    pub fn missed(date: NaiveDate, reason: &str) -> Self {
        Self {
            date,
            status: InjectionStatus::Missed,
            time: None,
            units: None,
            location: None,
            side: None,
            note: None,
            miss_reason: Some(reason.to_string()),
        }
    }

    pub fn at(mut self, location: InjectionSite, side: BodySide) -> Self {
        self.location = Some(location);
        self.side = Some(side);
        self
    }

    /// When the dose was given; `None` for missed or untimed records.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self.status {
            InjectionStatus::Done => self.time.map(|t| self.date.and_time(t)),
            InjectionStatus::Missed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdherenceSummary {
    pub done: usize,
    pub missed: usize,
    /// Share of recorded days that were done, 0-100
    pub percent: f64,
}

/// Injection records keyed by calendar day, at most one per day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InjectionLog {
    records: Vec<InjectionRecord>,
}

impl InjectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<InjectionRecord>) -> PKResult<Self> {
        let mut log = Self::new();
        for record in records {
            log.insert(record)?;
        }
        Ok(log)
    }

    /// Add a record for a day that has none yet.
    pub fn insert(&mut self, record: InjectionRecord) -> PKResult<()> {
        match self.position(record.date) {
            Ok(_) => Err(PKError::InvalidDosing(format!(
                "an injection is already recorded for {}",
                record.date
            ))),
            Err(index) => {
                self.records.insert(index, record);
                Ok(())
            }
        }
    }

    /// Replace the record for its day, or add it when the day is empty.
    pub fn upsert(&mut self, record: InjectionRecord) -> Option<InjectionRecord> {
        match self.position(record.date) {
            Ok(index) => Some(std::mem::replace(&mut self.records[index], record)),
            Err(index) => {
                self.records.insert(index, record);
                None
            }
        }
    }

    pub fn remove(&mut self, date: NaiveDate) -> Option<InjectionRecord> {
        self.position(date).ok().map(|index| self.records.remove(index))
    }

    pub fn get(&self, date: NaiveDate) -> Option<&InjectionRecord> {
        self.position(date).ok().map(|index| &self.records[index])
    }

    pub fn records(&self) -> &[InjectionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert backfilled records, skipping any day that gained a record.
    pub fn extend_missing(&mut self, records: Vec<InjectionRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if self.insert(record).is_ok() {
                added += 1;
            }
        }
        added
    }

    pub fn adherence(&self, from: NaiveDate, to: NaiveDate) -> AdherenceSummary {
        let (done, missed) = self
            .records
            .iter()
            .filter(|r| r.date >= from && r.date <= to)
            .fold((0, 0), |(done, missed), r| match r.status {
                InjectionStatus::Done => (done + 1, missed),
                InjectionStatus::Missed => (done, missed + 1),
            });

        let total = done + missed;
        let percent = if total == 0 {
            0.0
        } else {
            100.0 * done as f64 / total as f64
        };

        AdherenceSummary { done, missed, percent }
    }

    fn position(&self, date: NaiveDate) -> Result<usize, usize> {
        self.records.binary_search_by_key(&date, |r| r.date)
    }
}
