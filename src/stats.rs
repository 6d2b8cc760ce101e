//! Derived statistics over contribution records.
//!
//! Pure functions consumed by the UI: totals and goal progress, the
//! contributor leaderboard, monthly trends, giving pace, and the member
//! directory. Nothing here touches the cache or the network.

use std::collections::{BTreeMap, HashSet};

use crate::models::ContributionRecord;

/// Headline numbers for one fund.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundStats {
    pub total_collected: f64,
    pub remaining: f64,
    /// Percent of goal reached, capped at 100; 0 when no goal is set.
    pub progress_percent: f64,
    pub entry_count: usize,
    /// Distinct non-blank member names.
    pub unique_contributors: usize,
    pub average_contribution: f64,
    pub average_per_person: f64,
    pub largest_contribution: f64,
}

impl FundStats {
    pub fn compute(contributions: &[ContributionRecord], goal_amount: f64) -> Self {
        let total_collected: f64 = contributions.iter().map(|c| c.amount).sum();
        let remaining = (goal_amount - total_collected).max(0.0);
        let progress_percent = if goal_amount > 0.0 {
            ((total_collected / goal_amount) * 100.0).min(100.0)
        } else {
            0.0
        };

        let unique: HashSet<&str> = contributions
            .iter()
            .map(|c| c.member.trim())
            .filter(|m| !m.is_empty())
            .collect();

        let entry_count = contributions.len();
        let average_contribution = if entry_count > 0 {
            (total_collected / entry_count as f64).round()
        } else {
            0.0
        };
        let average_per_person = if unique.is_empty() {
            0.0
        } else {
            (total_collected / unique.len() as f64).round()
        };
        let largest_contribution = contributions
            .iter()
            .map(|c| c.amount)
            .fold(0.0_f64, f64::max);

        Self {
            total_collected,
            remaining,
            progress_percent,
            entry_count,
            unique_contributors: unique.len(),
            average_contribution,
            average_per_person,
            largest_contribution,
        }
    }

    pub fn goal_reached(&self) -> bool {
        self.remaining <= 0.0 && self.total_collected > 0.0
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributorTotal {
    pub member: String,
    pub total: f64,
    pub entries: usize,
}

/// Per-member totals sorted by amount descending, limited to `limit` rows.
/// Blank members aggregate under "Anonymous". Ties break on name so the
/// ordering is stable across recomputes.
pub fn top_contributors(
    contributions: &[ContributionRecord],
    limit: usize,
) -> Vec<ContributorTotal> {
    let mut totals: BTreeMap<String, ContributorTotal> = BTreeMap::new();
    for record in contributions {
        let member = record.member_display().to_string();
        let entry = totals
            .entry(member.clone())
            .or_insert_with(|| ContributorTotal {
                member,
                total: 0.0,
                entries: 0,
            });
        entry.total += record.amount;
        entry.entries += 1;
    }

    let mut rows: Vec<ContributorTotal> = totals.into_values().collect();
    rows.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.member.cmp(&b.member))
    });
    rows.truncate(limit);
    rows
}

/// One month's bucket in the trend view.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    /// "YYYY-MM"
    pub month: String,
    pub total: f64,
    pub entries: usize,
    /// Cumulative distinct contributors up to and including this month.
    pub contributors_to_date: usize,
}

/// Monthly totals in chronological order. Records without a parseable date
/// are skipped; they still count toward `FundStats`, just not the trend.
pub fn monthly_series(contributions: &[ContributionRecord]) -> Vec<MonthlyTotal> {
    let mut dated: Vec<&ContributionRecord> = contributions
        .iter()
        .filter(|c| c.month_key().is_some())
        .collect();
    dated.sort_by_key(|c| c.date_value());

    let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut growth: BTreeMap<String, usize> = BTreeMap::new();

    for record in dated {
        let Some(month) = record.month_key() else {
            continue;
        };
        let bucket = buckets.entry(month.clone()).or_insert((0.0, 0));
        bucket.0 += record.amount;
        bucket.1 += 1;

        let member = record.member.trim();
        if !member.is_empty() {
            seen.insert(member.to_lowercase());
        }
        growth.insert(month, seen.len());
    }

    buckets
        .into_iter()
        .map(|(month, (total, entries))| {
            let contributors_to_date = growth.get(&month).copied().unwrap_or(0);
            MonthlyTotal {
                month,
                total,
                entries,
                contributors_to_date,
            }
        })
        .collect()
}

pub fn best_month(series: &[MonthlyTotal]) -> Option<&MonthlyTotal> {
    series.iter().max_by(|a, b| {
        a.total
            .partial_cmp(&b.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Projection of when the goal will be reached at the current giving rate.
#[derive(Debug, Clone, PartialEq)]
pub enum GivingPace {
    GoalReached,
    Projected {
        average_per_month: f64,
        months_to_goal: i64,
    },
}

/// None when there is no dated giving history to project from.
pub fn giving_pace(contributions: &[ContributionRecord], goal_amount: f64) -> Option<GivingPace> {
    let total: f64 = contributions.iter().map(|c| c.amount).sum();
    let remaining = (goal_amount - total).max(0.0);
    if remaining <= 0.0 && total > 0.0 {
        return Some(GivingPace::GoalReached);
    }

    let months: HashSet<String> = contributions.iter().filter_map(|c| c.month_key()).collect();
    if months.is_empty() {
        return None;
    }

    let average_per_month = total / months.len() as f64;
    if average_per_month <= 0.0 {
        return None;
    }

    Some(GivingPace::Projected {
        average_per_month,
        months_to_goal: (remaining / average_per_month).ceil() as i64,
    })
}

/// Distinct trimmed member names, sorted; blanks skipped. The member
/// directory the Members tab lists.
pub fn member_directory(contributions: &[ContributionRecord]) -> Vec<String> {
    let mut names: Vec<String> = contributions
        .iter()
        .map(|c| c.member.trim())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    names.sort();
    names
}

/// All of one member's contributions, matched case-insensitively on the
/// exact trimmed name.
pub fn contributions_for_member<'a>(
    contributions: &'a [ContributionRecord],
    name: &str,
) -> Vec<&'a ContributionRecord> {
    let wanted = name.trim().to_lowercase();
    contributions
        .iter()
        .filter(|c| c.member.trim().to_lowercase() == wanted)
        .collect()
}

/// Per-category totals for a set of records, sorted by amount descending.
/// Blank categories group under "Other".
pub fn category_totals<'a>(
    records: impl IntoIterator<Item = &'a ContributionRecord>,
) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        *totals
            .entry(record.category_display().to_string())
            .or_insert(0.0) += record.amount;
    }
    let mut rows: Vec<(String, f64)> = totals.into_iter().collect();
    rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    rows
}

/// Timeline ordering: newest first, undated records last.
pub fn sort_by_date_desc(contributions: &mut [ContributionRecord]) {
    contributions.sort_by(|a, b| match (b.date_value(), a.date_value()) {
        (Some(db), Some(da)) => db.cmp(&da),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(member: &str, amount: f64, date: &str, category: &str) -> ContributionRecord {
        ContributionRecord {
            member: member.to_string(),
            amount,
            date: date.to_string(),
            category: category.to_string(),
            notes: String::new(),
        }
    }

    fn sample() -> Vec<ContributionRecord> {
        vec![
            record("Asha", 500.0, "2024-01-05T00:00:00Z", "Tithe"),
            record("Binu", 1500.0, "2024-01-20T00:00:00Z", "Offering"),
            record("Asha", 1000.0, "2024-02-10T00:00:00Z", "Tithe"),
            record("", 250.0, "2024-02-15T00:00:00Z", ""),
        ]
    }

    #[test]
    fn test_fund_stats_totals() {
        let stats = FundStats::compute(&sample(), 10_000.0);
        assert_eq!(stats.total_collected, 3250.0);
        assert_eq!(stats.remaining, 6750.0);
        assert_eq!(stats.entry_count, 4);
        assert_eq!(stats.unique_contributors, 2);
        assert_eq!(stats.average_contribution, 813.0);
        assert_eq!(stats.average_per_person, 1625.0);
        assert_eq!(stats.largest_contribution, 1500.0);
        assert!((stats.progress_percent - 32.5).abs() < f64::EPSILON);
        assert!(!stats.goal_reached());
    }

    #[test]
    fn test_progress_capped_and_zero_goal() {
        let over = FundStats::compute(&sample(), 1000.0);
        assert_eq!(over.progress_percent, 100.0);
        assert_eq!(over.remaining, 0.0);
        assert!(over.goal_reached());

        let no_goal = FundStats::compute(&sample(), 0.0);
        assert_eq!(no_goal.progress_percent, 0.0);
    }

    #[test]
    fn test_empty_fund_stats_are_zero() {
        let stats = FundStats::compute(&[], 5000.0);
        assert_eq!(stats.total_collected, 0.0);
        assert_eq!(stats.average_contribution, 0.0);
        assert_eq!(stats.average_per_person, 0.0);
        assert_eq!(stats.largest_contribution, 0.0);
    }

    #[test]
    fn test_top_contributors_ordering_and_anonymous() {
        let rows = top_contributors(&sample(), 10);
        assert_eq!(rows[0].member, "Binu");
        assert_eq!(rows[0].total, 1500.0);
        assert_eq!(rows[1].member, "Asha");
        assert_eq!(rows[1].total, 1500.0);
        assert_eq!(rows[1].entries, 2);
        assert_eq!(rows[2].member, "Anonymous");
    }

    #[test]
    fn test_top_contributors_tie_breaks_alphabetically() {
        let data = vec![
            record("Zara", 100.0, "", ""),
            record("Anil", 100.0, "", ""),
        ];
        let rows = top_contributors(&data, 10);
        assert_eq!(rows[0].member, "Anil");
        assert_eq!(rows[1].member, "Zara");
    }

    #[test]
    fn test_top_contributors_respects_limit() {
        assert_eq!(top_contributors(&sample(), 1).len(), 1);
    }

    #[test]
    fn test_monthly_series_totals_and_growth() {
        let series = monthly_series(&sample());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].month, "2024-01");
        assert_eq!(series[0].total, 2000.0);
        assert_eq!(series[0].entries, 2);
        assert_eq!(series[0].contributors_to_date, 2);
        assert_eq!(series[1].month, "2024-02");
        assert_eq!(series[1].total, 1250.0);
        // Anonymous record does not grow the contributor count
        assert_eq!(series[1].contributors_to_date, 2);
    }

    #[test]
    fn test_best_month() {
        let series = monthly_series(&sample());
        assert_eq!(best_month(&series).unwrap().month, "2024-01");
    }

    #[test]
    fn test_giving_pace_projection() {
        // 3250 collected over 2 months toward 10000: 6750 remaining at
        // 1625/month is 5 months (ceil of 4.15...)
        match giving_pace(&sample(), 10_000.0) {
            Some(GivingPace::Projected {
                average_per_month,
                months_to_goal,
            }) => {
                assert_eq!(average_per_month, 1625.0);
                assert_eq!(months_to_goal, 5);
            }
            other => panic!("unexpected pace: {:?}", other),
        }
    }

    #[test]
    fn test_giving_pace_goal_reached_and_no_history() {
        assert_eq!(
            giving_pace(&sample(), 3000.0),
            Some(GivingPace::GoalReached)
        );
        assert_eq!(giving_pace(&[], 5000.0), None);

        let undated = vec![record("Asha", 100.0, "", "Tithe")];
        assert_eq!(giving_pace(&undated, 5000.0), None);
    }

    #[test]
    fn test_member_directory_sorted_distinct() {
        let names = member_directory(&sample());
        assert_eq!(names, vec!["Asha".to_string(), "Binu".to_string()]);
    }

    #[test]
    fn test_contributions_for_member_case_insensitive() {
        let data = sample();
        let asha = contributions_for_member(&data, "asha");
        assert_eq!(asha.len(), 2);
        assert_eq!(contributions_for_member(&data, " ASHA ").len(), 2);
        assert!(contributions_for_member(&data, "nobody").is_empty());
    }

    #[test]
    fn test_category_totals_grouping() {
        let data = sample();
        let totals = category_totals(data.iter());
        assert_eq!(totals.len(), 3);
        assert!(totals.iter().any(|(c, t)| c == "Tithe" && *t == 1500.0));
        assert!(totals.iter().any(|(c, t)| c == "Offering" && *t == 1500.0));
        // Blank category groups under "Other", and the smallest total sorts last
        assert_eq!(totals[2], ("Other".to_string(), 250.0));
    }

    #[test]
    fn test_sort_by_date_desc_undated_last() {
        let mut data = vec![
            record("A", 1.0, "", ""),
            record("B", 2.0, "2024-01-05T00:00:00Z", ""),
            record("C", 3.0, "2024-03-05T00:00:00Z", ""),
        ];
        sort_by_date_desc(&mut data);
        assert_eq!(data[0].member, "C");
        assert_eq!(data[1].member, "B");
        assert_eq!(data[2].member, "A");
    }
}
