//! Keyed-field search over arbitrary JSON.
//!
//! Upstream schemas have changed names for the same concept several times, so
//! each field is looked up through a list of synonyms. Within a list the first
//! key that yields a usable value wins.

use serde_json::{Map, Value};

use super::normalize::Amounts;
use super::primitives::parse_grouped_integer;
use crate::types::Details;

/// Synonym lists for one schema family.
pub struct KeySet {
    pub raised: &'static [&'static str],
    pub goal: &'static [&'static str],
    pub percent: &'static [&'static str],
    pub supporters: &'static [&'static str],
    pub steady_supporters: &'static [&'static str],
}

/// Used by the recursive walk (hydration and stream payloads).
pub const WALK_KEYS: KeySet = KeySet {
    raised: &["raised", "collected", "amountCollected", "sum", "amount", "raisedAmount", "totalAmount"],
    goal: &["goal", "target", "amountGoal", "goalAmount", "total", "requiredAmount"],
    percent: &["percent", "percentage", "progress", "progressPercent"],
    supporters: &["supporters", "donors", "donorsCount", "supportersCount"],
    steady_supporters: &["steadySupporters", "steady_supporters", "permanentSupportersCount"],
};

/// Used by the `props.pageProps` path guess on hydration payloads.
pub const PAGE_PROPS_KEYS: KeySet = KeySet {
    raised: &["raised", "collected", "amountCollected", "sum", "amount", "raisedAmount"],
    goal: &["goal", "target", "amountGoal", "goalAmount", "total"],
    percent: &["percent", "percentage", "progress"],
    supporters: &["supporters", "donors", "donorsCount", "backersCount", "count"],
    steady_supporters: &["steadySupporters", "steady_supporters", "regularSupporters"],
};

/// Non-negative amount from a JSON number or a digit string ("12 345").
/// Fractions are truncated.
pub fn to_amount(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                (i >= 0).then_some(i)
            } else {
                n.as_f64().filter(|f| *f >= 0.0 && f.is_finite()).map(|f| f.trunc() as i64)
            }
        }
        Value::String(s) => parse_grouped_integer(s),
        _ => None,
    }
}

/// A percent is only trusted as a JSON number within 0..=100.
fn to_percent(v: &Value) -> Option<f64> {
    v.as_f64().filter(|p| (0.0..=100.0).contains(p))
}

fn first_of<'a, T>(
    obj: &'a Map<String, Value>,
    keys: &[&str],
    coerce: impl Fn(&'a Value) -> Option<T>,
) -> Option<T> {
    keys.iter().find_map(|k| obj.get(*k).and_then(&coerce))
}

/// Read one object with `keys`. `None` unless it carries a raised- or goal-like field.
pub fn amounts_from_object(obj: &Map<String, Value>, keys: &KeySet) -> Option<(Amounts, Details)> {
    let raised = first_of(obj, keys.raised, to_amount);
    let goal = first_of(obj, keys.goal, to_amount);
    if raised.is_none() && goal.is_none() {
        return None;
    }
    let amounts = Amounts {
        raised,
        goal,
        percent: first_of(obj, keys.percent, to_percent),
        missing: None,
    };
    let details = Details {
        supporters: first_of(obj, keys.supporters, to_amount),
        steady_supporters: first_of(obj, keys.steady_supporters, to_amount),
        ..Default::default()
    };
    Some((amounts, details))
}

/// Depth-first search, objects before their children, children in key order.
///
/// The first object that carries a raised- or goal-like field wins and the
/// walk stops there, even if a sibling deeper in the tree looks richer.
pub fn walk(value: &Value) -> Option<(Amounts, Details)> {
    match value {
        Value::Object(obj) => amounts_from_object(obj, &WALK_KEYS)
            .or_else(|| obj.values().find_map(walk)),
        Value::Array(items) => items.iter().find_map(walk),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amounts_coerce_numbers_and_digit_strings() {
        assert_eq!(to_amount(&json!(12)), Some(12));
        assert_eq!(to_amount(&json!(12.9)), Some(12));
        assert_eq!(to_amount(&json!("12 345")), Some(12_345));
        assert_eq!(to_amount(&json!(-1)), None);
        assert_eq!(to_amount(&json!("12.5")), None);
        assert_eq!(to_amount(&json!(null)), None);
        assert_eq!(to_amount(&json!(true)), None);
    }

    #[test]
    fn first_synonym_with_usable_value_wins() {
        let v = json!({ "raised": "n/a", "collected": 10, "amount": 99, "target": 50 });
        let (a, _) = walk(&v).unwrap();
        assert_eq!(a.raised, Some(10));
        assert_eq!(a.goal, Some(50));
    }

    #[test]
    fn percent_must_be_numeric_and_in_range() {
        let v = json!({ "goal": 100, "percent": "50", "percentage": 140, "progress": 30 });
        let (a, _) = walk(&v).unwrap();
        assert_eq!(a.percent, Some(30.0));
    }

    #[test]
    fn walk_stops_at_first_matching_object() {
        let v = json!({
            "meta": { "amount": 1 },
            "fundraiser": { "raised": 100, "goal": 200, "supporters": 7 }
        });
        let (a, d) = walk(&v).unwrap();
        assert_eq!(a.raised, Some(1));
        assert_eq!(a.goal, None);
        assert_eq!(d.supporters, None);
    }

    #[test]
    fn walk_descends_into_arrays() {
        let v = json!([{ "x": 1 }, [{ "donors": 3, "target": 600, "steadySupporters": 2 }]]);
        let (a, d) = walk(&v).unwrap();
        assert_eq!(a.goal, Some(600));
        assert_eq!(d.supporters, Some(3));
        assert_eq!(d.steady_supporters, Some(2));
    }

    #[test]
    fn walk_finds_nothing_in_unrelated_json() {
        assert!(walk(&json!({ "a": [1, 2, { "b": "c" }] })).is_none());
        assert!(walk(&json!("raised")).is_none());
    }
}
