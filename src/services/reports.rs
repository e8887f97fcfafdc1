//! Fixed aggregation reports over tour rows.
//!
//! The repository fetches non-secret tour rows; these builders do the
//! grouping, so the report shape lives in one testable place.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Minimum average rating for a tour to count towards the stats report.
const STATS_MIN_RATING: f64 = 4.5;

/// Input row for the stats report.
#[derive(Debug, Clone)]
pub struct TourStatRow {
    pub difficulty: String,
    pub ratings_average: f64,
    pub ratings_quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub difficulty: String,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// Groups well-rated tours by uppercased difficulty, sorted by ascending
/// average price. The EASY group is excluded from the report.
#[must_use]
pub fn tour_stats(rows: &[TourStatRow]) -> Vec<DifficultyStats> {
    struct Acc {
        count: i64,
        ratings: i64,
        rating_sum: f64,
        price_sum: f64,
        min_price: f64,
        max_price: f64,
    }

    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();

    for row in rows {
        if row.ratings_average < STATS_MIN_RATING {
            continue;
        }
        let key = row.difficulty.to_uppercase();
        let acc = groups.entry(key).or_insert(Acc {
            count: 0,
            ratings: 0,
            rating_sum: 0.0,
            price_sum: 0.0,
            min_price: f64::INFINITY,
            max_price: f64::NEG_INFINITY,
        });
        acc.count += 1;
        acc.ratings += row.ratings_quantity;
        acc.rating_sum += row.ratings_average;
        acc.price_sum += row.price;
        acc.min_price = acc.min_price.min(row.price);
        acc.max_price = acc.max_price.max(row.price);
    }

    let mut stats: Vec<DifficultyStats> = groups
        .into_iter()
        .filter(|(difficulty, _)| difficulty != "EASY")
        .map(|(difficulty, acc)| {
            let n = acc.count as f64;
            DifficultyStats {
                difficulty,
                num_tours: acc.count,
                num_ratings: acc.ratings,
                avg_rating: acc.rating_sum / n,
                avg_price: acc.price_sum / n,
                min_price: acc.min_price,
                max_price: acc.max_price,
            }
        })
        .collect();

    stats.sort_by(|a, b| a.avg_price.total_cmp(&b.avg_price));
    stats
}

/// Input row for the monthly plan: a tour name and its start dates.
#[derive(Debug, Clone)]
pub struct PlanRow {
    pub name: String,
    pub start_dates: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlanEntry {
    pub month: u32,
    pub num_tours: i64,
    pub tours: Vec<String>,
}

/// Expands each tour's start dates into one row per date, keeps the given
/// year, and groups by month. Busiest months first; a year with no starts
/// yields an empty plan.
#[must_use]
pub fn monthly_plan(rows: &[PlanRow], year: i32) -> Vec<MonthlyPlanEntry> {
    let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for row in rows {
        for date in &row.start_dates {
            if date.year() == year {
                months.entry(date.month()).or_default().push(row.name.clone());
            }
        }
    }

    let mut plan: Vec<MonthlyPlanEntry> = months
        .into_iter()
        .map(|(month, tours)| MonthlyPlanEntry {
            month,
            num_tours: tours.len() as i64,
            tours,
        })
        .collect();

    // Descending by count; the BTreeMap ordering keeps ties on ascending month.
    plan.sort_by(|a, b| b.num_tours.cmp(&a.num_tours));
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(difficulty: &str, rating: f64, quantity: i64, price: f64) -> TourStatRow {
        TourStatRow {
            difficulty: difficulty.to_string(),
            ratings_average: rating,
            ratings_quantity: quantity,
            price,
        }
    }

    #[test]
    fn stats_group_and_sort_by_avg_price() {
        let rows = vec![
            row("medium", 4.8, 20, 1000.0),
            row("medium", 4.6, 10, 500.0),
            row("hard", 4.9, 5, 300.0),
        ];
        let stats = tour_stats(&rows);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].difficulty, "HARD");
        assert_eq!(stats[1].difficulty, "MEDIUM");
        assert_eq!(stats[1].num_tours, 2);
        assert_eq!(stats[1].num_ratings, 30);
        assert!((stats[1].avg_price - 750.0).abs() < 1e-9);
        assert!((stats[1].min_price - 500.0).abs() < 1e-9);
        assert!((stats[1].max_price - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn stats_drop_easy_and_low_rated_tours() {
        let rows = vec![
            row("easy", 4.9, 10, 100.0),
            row("hard", 4.4, 10, 100.0),
            row("hard", 4.7, 3, 200.0),
        ];
        let stats = tour_stats(&rows);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].difficulty, "HARD");
        assert_eq!(stats[0].num_tours, 1);
    }

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn plan_groups_by_month_sorted_by_count() {
        let rows = vec![
            PlanRow {
                name: "Forest Hiker".to_string(),
                start_dates: vec![date(2024, 6, 1), date(2024, 7, 10), date(2025, 6, 1)],
            },
            PlanRow {
                name: "Sea Explorer".to_string(),
                start_dates: vec![date(2024, 7, 20)],
            },
        ];
        let plan = monthly_plan(&rows, 2024);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].month, 7);
        assert_eq!(plan[0].num_tours, 2);
        assert_eq!(
            plan[0].tours,
            vec!["Forest Hiker".to_string(), "Sea Explorer".to_string()]
        );
        assert_eq!(plan[1].month, 6);
    }

    #[test]
    fn plan_for_empty_year_is_empty_not_an_error() {
        let rows = vec![PlanRow {
            name: "Forest Hiker".to_string(),
            start_dates: vec![date(2024, 6, 1)],
        }];
        assert!(monthly_plan(&rows, 1999).is_empty());
    }
}
