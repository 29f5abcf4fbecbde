//! Field inference shared by every extraction strategy.

use crate::config::Fundraiser;
use crate::types::{Details, FundraiserRecord};

/// Whatever a strategy managed to read, before inference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Amounts {
    pub raised: Option<i64>,
    pub goal: Option<i64>,
    pub percent: Option<f64>,
    /// Only the text scan reads this directly ("Brakuje ... zł").
    pub missing: Option<i64>,
}

impl Amounts {
    /// Fill in what the known fields imply.
    ///
    /// `raised + missing = goal`, `percent = 100 * raised / goal`. Once both
    /// raised and goal are known, `missing` is always recomputed from them.
    pub fn infer(self) -> Amounts {
        let Amounts { mut raised, mut goal, mut percent, mut missing } = self;

        if goal.is_none() {
            if let (Some(r), Some(m)) = (raised, missing) {
                goal = r.checked_add(m);
            }
        }
        if goal.is_none() {
            if let (Some(r), Some(p)) = (raised, percent) {
                if p > 0.0 {
                    goal = Some((r as f64 / (p / 100.0)).round() as i64);
                }
            }
        }
        if raised.is_none() {
            if let (Some(g), Some(p)) = (goal, percent) {
                raised = Some((g as f64 * (p / 100.0)).round() as i64);
            }
        }
        if percent.is_none() {
            if let (Some(r), Some(g)) = (raised, goal) {
                if g > 0 {
                    percent = Some(round2(100.0 * r as f64 / g as f64));
                }
            }
        }
        if let (Some(r), Some(g)) = (raised, goal) {
            missing = Some(g - r);
        }

        Amounts {
            raised,
            goal,
            percent: percent.map(|p| p.clamp(0.0, 100.0)),
            missing,
        }
    }

    /// Infer, then build the record. `None` when neither raised nor goal is known.
    pub fn into_record(self, details: Details, fundraiser: &Fundraiser) -> Option<FundraiserRecord> {
        let a = self.infer();
        if a.raised.is_none() && a.goal.is_none() {
            return None;
        }
        Some(FundraiserRecord {
            raised: a.raised,
            missing: a.missing,
            goal: a.goal,
            percent: a.percent,
            supporters: details.supporters,
            steady_supporters: details.steady_supporters,
            start_date: details.start_date,
            end_date: details.end_date,
            title: details.title,
            url: fundraiser.url.clone(),
            slug: fundraiser.slug.clone(),
        })
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
