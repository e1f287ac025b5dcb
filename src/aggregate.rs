//! Totals and group-by sums over a record snapshot.
//!
//! Every function recomputes from the slice it is given. Nothing is cached
//! between calls and the input is never reordered in place.

use crate::record::{Record, round2};
use serde::Serialize;
use std::collections::BTreeMap;

/// Community-wide totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub total_quantity: f64,
    pub total_ethanol: f64,
    /// `None` when no waste has been recorded, so there is nothing to divide by.
    pub efficiency_percent: Option<f64>,
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAggregate {
    pub user: String,
    pub total_quantity: f64,
    pub total_ethanol: f64,
}

/// Ethanol produced per waste category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAggregate {
    pub category: String,
    pub ethanol: f64,
}

/// Personal totals shown next to the submission form, rounded for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub total_quantity: f64,
    pub total_ethanol: f64,
}

/// Sum values in a canonical order so the result does not depend on the
/// order the store returned them in.
fn stable_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    values.into_iter().sum()
}

/// Sum quantity and ethanol across all records
///
/// # Examples
/// ```
/// use ethanol_dashboard::aggregate::total_summary;
///
/// let summary = total_summary(&[]);
/// assert_eq!(summary.total_quantity, 0.0);
/// assert_eq!(summary.efficiency_percent, None);
/// ```
pub fn total_summary(records: &[Record]) -> AggregateSummary {
    let total_quantity = stable_sum(records.iter().map(|r| r.quantity).collect());
    let total_ethanol = stable_sum(records.iter().map(|r| r.ethanol).collect());

    let efficiency_percent = if total_quantity > 0.0 {
        Some(total_ethanol / total_quantity * 100.0)
    } else {
        None
    };

    AggregateSummary {
        total_quantity,
        total_ethanol,
        efficiency_percent,
    }
}

/// Group records by exact user name and sum each group
///
/// Rows come back as a leaderboard: most ethanol first, ties by name.
pub fn by_user(records: &[Record]) -> Vec<UserAggregate> {
    let mut groups: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.user.as_str()).or_default();
        entry.0.push(record.quantity);
        entry.1.push(record.ethanol);
    }

    let mut rows: Vec<UserAggregate> = groups
        .into_iter()
        .map(|(user, (quantities, ethanol))| UserAggregate {
            user: user.to_string(),
            total_quantity: stable_sum(quantities),
            total_ethanol: stable_sum(ethanol),
        })
        .collect();

    // BTreeMap already yields names ascending; a stable sort keeps that for ties.
    rows.sort_by(|a, b| b.total_ethanol.total_cmp(&a.total_ethanol));
    rows
}

/// Group records by waste category and sum ethanol, most productive first.
pub fn by_category(records: &[Record]) -> Vec<CategoryAggregate> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.category.as_str())
            .or_default()
            .push(record.ethanol);
    }

    let mut rows: Vec<CategoryAggregate> = groups
        .into_iter()
        .map(|(category, ethanol)| CategoryAggregate {
            category: category.to_string(),
            ethanol: stable_sum(ethanol),
        })
        .collect();

    rows.sort_by(|a, b| b.ethanol.total_cmp(&a.ethanol));
    rows
}

/// Personal sidebar totals, or `None` if the user has no records yet.
pub fn user_summary(records: &[Record]) -> Option<UserSummary> {
    if records.is_empty() {
        return None;
    }
    let summary = total_summary(records);
    Some(UserSummary {
        total_quantity: round2(summary.total_quantity),
        total_ethanol: round2(summary.total_ethanol),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(user: &str, category: &str, quantity: f64, ethanol: f64) -> Record {
        Record {
            user: user.to_string(),
            category: category.to_string(),
            quantity,
            ethanol,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn scenario() -> Vec<Record> {
        vec![
            record("A", "Algae", 10.0, 5.0),
            record("A", "Tea Powder Waste", 4.0, 1.0),
            record("B", "Algae", 2.0, 1.0),
        ]
    }

    #[test]
    fn empty_summary_has_no_efficiency() {
        let summary = total_summary(&[]);
        assert_eq!(summary.total_quantity, 0.0);
        assert_eq!(summary.total_ethanol, 0.0);
        assert_eq!(summary.efficiency_percent, None);
    }

    #[test]
    fn zero_quantity_summary_has_no_efficiency() {
        let records = vec![record("A", "Algae", 0.0, 0.0)];
        assert_eq!(total_summary(&records).efficiency_percent, None);
    }

    #[test]
    fn scenario_totals() {
        let summary = total_summary(&scenario());
        assert_eq!(summary.total_quantity, 16.0);
        assert_eq!(summary.total_ethanol, 7.0);
        let efficiency = summary.efficiency_percent.unwrap();
        assert!((efficiency - 43.75).abs() < 1e-9);
    }

    #[test]
    fn scenario_by_user() {
        let rows = by_user(&scenario());
        assert_eq!(
            rows,
            vec![
                UserAggregate { user: "A".into(), total_quantity: 14.0, total_ethanol: 6.0 },
                UserAggregate { user: "B".into(), total_quantity: 2.0, total_ethanol: 1.0 },
            ]
        );
    }

    #[test]
    fn scenario_by_category() {
        let rows = by_category(&scenario());
        assert_eq!(rows[0], CategoryAggregate { category: "Algae".into(), ethanol: 6.0 });
        assert_eq!(rows[1], CategoryAggregate { category: "Tea Powder Waste".into(), ethanol: 1.0 });
    }

    #[test]
    fn grouping_is_case_sensitive() {
        let records = vec![record("asha", "Algae", 1.0, 0.5), record("Asha", "Algae", 1.0, 0.5)];
        assert_eq!(by_user(&records).len(), 2);
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let records = vec![record("Zed", "Algae", 2.0, 1.0), record("Amy", "Algae", 2.0, 1.0)];
        let names: Vec<_> = by_user(&records).into_iter().map(|r| r.user).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    fn messy_records() -> Vec<Record> {
        let users = ["Asha", "Ravi", "Meera", "ravi"];
        (0..40)
            .map(|i| {
                let quantity = 0.1 * (i as f64) + 0.37;
                record(users[i % users.len()], "Corn Fibres", quantity, quantity * 0.45)
            })
            .collect()
    }

    #[test]
    fn totals_do_not_depend_on_order() {
        let records = messy_records();
        let mut reversed = records.clone();
        reversed.reverse();
        let mut interleaved: Vec<Record> = records.iter().step_by(2).cloned().collect();
        interleaved.extend(records.iter().skip(1).step_by(2).cloned());

        let expected = total_summary(&records);
        assert_eq!(total_summary(&reversed), expected);
        assert_eq!(total_summary(&interleaved), expected);
        assert_eq!(by_user(&reversed), by_user(&records));
        assert_eq!(by_category(&interleaved), by_category(&records));
    }

    #[test]
    fn by_user_partitions_the_grand_total() {
        let records = messy_records();
        let grand = total_summary(&records);
        let rows = by_user(&records);
        let ethanol: f64 = rows.iter().map(|r| r.total_ethanol).sum();
        let quantity: f64 = rows.iter().map(|r| r.total_quantity).sum();
        assert!((ethanol - grand.total_ethanol).abs() < 1e-9);
        assert!((quantity - grand.total_quantity).abs() < 1e-9);
    }

    #[test]
    fn aggregation_leaves_input_untouched() {
        let records = scenario();
        let before = records.clone();
        let _ = by_user(&records);
        let _ = by_category(&records);
        assert_eq!(records, before);
    }

    #[test]
    fn user_summary_rounds_and_handles_empty() {
        assert_eq!(user_summary(&[]), None);
        let records = vec![record("A", "Matchstick Waste", 1.111, 0.19998)];
        assert_eq!(
            user_summary(&records),
            Some(UserSummary { total_quantity: 1.11, total_ethanol: 0.2 })
        );
    }
}
