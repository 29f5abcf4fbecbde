use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// FundraiserRecord
// ---------------------------------------------------------------------------

/// One normalized snapshot of a campaign. Amounts are whole złoty.
///
/// Built once per successful cycle by [`crate::parse::normalize::Amounts::into_record`]
/// and replaced wholesale on the next success; never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundraiserRecord {
    pub raised: Option<i64>,
    pub missing: Option<i64>,
    pub goal: Option<i64>,
    pub percent: Option<f64>,
    pub supporters: Option<i64>,
    pub steady_supporters: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub title: Option<String>,
    pub url: String,
    pub slug: String,
}

/// Non-financial fields a strategy may find alongside the amounts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Details {
    pub supporters: Option<i64>,
    pub steady_supporters: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub title: Option<String>,
}

impl FundraiserRecord {
    /// Value for a sensor key from [`SENSORS`]; `Value::Null` when unknown.
    pub fn sensor_value(&self, key: &str) -> Value {
        match key {
            "raised" => self.raised.into(),
            "missing" => self.missing.into(),
            "goal" => self.goal.into(),
            "percent" => self.percent.into(),
            "supporters" => self.supporters.into(),
            "steady_supporters" => self.steady_supporters.into(),
            "start_date" => self.start_date.map(|d| d.to_string()).into(),
            "end_date" => self.end_date.map(|d| d.to_string()).into(),
            _ => Value::Null,
        }
    }

    /// The three metadata attributes carried by every sensor.
    pub fn attributes(&self) -> Attributes {
        Attributes {
            url: self.url.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attributes {
    pub url: String,
    pub slug: String,
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Sensor table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
}

pub const SENSORS: &[SensorDescription] = &[
    SensorDescription { key: "raised", name: "Zebrano", unit: Some("PLN"), icon: "mdi:hand-coin" },
    SensorDescription { key: "missing", name: "Brakuje", unit: Some("PLN"), icon: "mdi:cash-minus" },
    SensorDescription { key: "goal", name: "Cel", unit: Some("PLN"), icon: "mdi:target" },
    SensorDescription { key: "percent", name: "Postęp", unit: Some("%"), icon: "mdi:percent" },
    SensorDescription { key: "supporters", name: "Wspierających", unit: Some("osób"), icon: "mdi:account-group" },
    SensorDescription { key: "steady_supporters", name: "Stałych pomagaczy", unit: Some("osób"), icon: "mdi:account-heart" },
    SensorDescription { key: "start_date", name: "Rozpoczęcie", unit: None, icon: "mdi:calendar-start" },
    SensorDescription { key: "end_date", name: "Zakończenie", unit: None, icon: "mdi:calendar-end" },
];

// ---------------------------------------------------------------------------
// Daily totals
// ---------------------------------------------------------------------------

/// Amount raised on one calendar day (difference against the previous day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyDelta {
    pub date: NaiveDate,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub raised: i64,
    /// Today's raised minus yesterday's stored value.
    pub raised_today: i64,
    /// Oldest first; today is never included.
    pub recent_days: Vec<DailyDelta>,
}
