// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use spendwise::aggregate::{month_over_month_change, monthly_aggregate, with_previous};
use spendwise::models::{Category, Month, Transaction};
use spendwise::utils::parse_datetime;
use std::collections::BTreeMap;

fn tx(category: Category, amount: &str, when: &str) -> Transaction {
    Transaction {
        id: format!("{}-{}-{}", when, category, amount),
        amount: amount.parse().unwrap(),
        currency: "USD".into(),
        category,
        description: String::new(),
        timestamp: parse_datetime(when).unwrap(),
    }
}

fn nov() -> Month {
    "2024-11".parse().unwrap()
}

fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

#[test]
fn empty_list_yields_zeroes() {
    let agg = monthly_aggregate(&[], nov());
    assert_eq!(agg.total_expenses, Decimal::ZERO);
    assert_eq!(agg.transaction_count, 0);
    assert_eq!(agg.average_daily, Decimal::ZERO);
    assert_eq!(agg.average_weekly, Decimal::ZERO);
    assert!(agg.categories.is_empty());
    assert!(agg.weekly.is_empty());
    assert!(agg.daily.is_empty());
}

#[test]
fn november_scenario() {
    let txs = vec![
        tx(Category::Food, "50", "2024-11-01 12:00"),
        tx(Category::Food, "30", "2024-11-02 08:30"),
        tx(Category::Travel, "20", "2024-11-02 19:00"),
    ];
    let agg = monthly_aggregate(&txs, nov());

    assert_eq!(agg.total_expenses, dec(100));
    assert_eq!(agg.transaction_count, 3);

    assert_eq!(agg.categories.len(), 2);
    assert_eq!(agg.categories[0].category, Category::Food);
    assert_eq!(agg.categories[0].total, dec(80));
    assert_eq!(agg.categories[0].percent, 80.0);
    assert_eq!(agg.categories[1].category, Category::Travel);
    assert_eq!(agg.categories[1].total, dec(20));
    assert_eq!(agg.categories[1].percent, 20.0);

    assert_eq!(agg.daily.len(), 2);
    assert_eq!(agg.daily[0].date, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
    assert_eq!(agg.daily[0].total, dec(50));
    assert_eq!(
        agg.daily[0].category_totals,
        BTreeMap::from([(Category::Food, dec(50))])
    );
    assert_eq!(agg.daily[1].date, NaiveDate::from_ymd_opt(2024, 11, 2).unwrap());
    assert_eq!(agg.daily[1].total, dec(50));
    assert_eq!(
        agg.daily[1].category_totals,
        BTreeMap::from([(Category::Food, dec(30)), (Category::Travel, dec(20))])
    );
}

#[test]
fn averages_use_calendar_days_and_overlapping_weeks() {
    // November 2024: 30 days, Friday the 1st, five Monday-start weeks.
    let txs = vec![tx(Category::Utilities, "150", "2024-11-15 10:00")];
    let agg = monthly_aggregate(&txs, nov());
    assert_eq!(agg.average_daily, dec(5));
    assert_eq!(agg.average_weekly, dec(30));
}

#[test]
fn weeks_start_on_monday() {
    let txs = vec![
        tx(Category::Food, "1", "2024-11-01 09:00"),  // Fri, week 1
        tx(Category::Food, "2", "2024-11-03 09:00"),  // Sun, week 1
        tx(Category::Food, "4", "2024-11-04 09:00"),  // Mon, week 2
        tx(Category::Other, "8", "2024-11-30 09:00"), // Sat, week 5
    ];
    let agg = monthly_aggregate(&txs, nov());
    let weeks: Vec<(u32, Decimal)> = agg
        .weekly
        .iter()
        .map(|w| (w.week_of_month, w.total))
        .collect();
    assert_eq!(weeks, vec![(1, dec(3)), (2, dec(4)), (5, dec(8))]);
}

#[test]
fn only_transactions_inside_the_month_count() {
    let txs = vec![
        tx(Category::Food, "10", "2024-10-31 23:59:59"),
        tx(Category::Food, "5", "2024-11-01 00:00:00"),
        tx(Category::Food, "5", "2024-11-30 23:59:59"),
        tx(Category::Food, "10", "2024-12-01 00:00:00"),
    ];
    let agg = monthly_aggregate(&txs, nov());
    assert_eq!(agg.total_expenses, dec(10));
    assert_eq!(agg.transaction_count, 2);
}

#[test]
fn category_percentages_sum_to_hundred() {
    let txs = vec![
        tx(Category::Food, "10.10", "2024-11-03 09:00"),
        tx(Category::Travel, "33.33", "2024-11-07 09:00"),
        tx(Category::Utilities, "7.07", "2024-11-09 09:00"),
        tx(Category::Other, "0.01", "2024-11-21 09:00"),
    ];
    let agg = monthly_aggregate(&txs, nov());
    let sum: f64 = agg.categories.iter().map(|c| c.percent).sum();
    assert!((sum - 100.0).abs() < 1e-9, "sum was {}", sum);
    // Largest first.
    assert_eq!(agg.categories[0].category, Category::Travel);
}

#[test]
fn zero_amounts_are_left_out_of_daily_breakdown() {
    let txs = vec![
        tx(Category::Food, "12", "2024-11-05 09:00"),
        tx(Category::Travel, "0", "2024-11-05 10:00"),
    ];
    let agg = monthly_aggregate(&txs, nov());
    assert_eq!(agg.transaction_count, 2);
    assert_eq!(
        agg.daily[0].category_totals,
        BTreeMap::from([(Category::Food, dec(12))])
    );
    let travel = agg
        .categories
        .iter()
        .find(|c| c.category == Category::Travel)
        .unwrap();
    assert_eq!(travel.percent, 0.0);
}

#[test]
fn month_over_month() {
    let txs = vec![
        tx(Category::Food, "100", "2024-10-10 09:00"),
        tx(Category::Food, "150", "2024-11-10 09:00"),
    ];
    let (current, previous, change) = with_previous(&txs, nov());
    assert_eq!(previous.total_expenses, dec(100));
    assert_eq!(current.total_expenses, dec(150));
    assert_eq!(change, Some(50.0));

    let doubled = monthly_aggregate(&[tx(Category::Food, "200", "2024-11-10 09:00")], nov());
    assert_eq!(month_over_month_change(&doubled, Some(&previous)), Some(100.0));

    let halved = monthly_aggregate(&[tx(Category::Food, "50", "2024-11-10 09:00")], nov());
    assert_eq!(month_over_month_change(&halved, Some(&previous)), Some(-50.0));
}

#[test]
fn month_over_month_without_baseline() {
    let current = monthly_aggregate(&[tx(Category::Food, "10", "2024-11-10 09:00")], nov());
    assert_eq!(month_over_month_change(&current, None), None);

    let empty_previous = monthly_aggregate(&[], nov().previous());
    assert_eq!(month_over_month_change(&current, Some(&empty_previous)), None);
}

#[test]
fn totals_saturate_instead_of_overflowing() {
    let big = |when: &str| Transaction {
        amount: Decimal::MAX,
        ..tx(Category::Food, "0", when)
    };
    let txs = vec![
        big("2024-11-01 09:00"),
        big("2024-11-01 10:00"),
        big("2024-11-09 10:00"),
    ];
    let agg = monthly_aggregate(&txs, nov());
    assert_eq!(agg.total_expenses, Decimal::MAX);
    assert_eq!(agg.transaction_count, 3);
    assert_eq!(agg.categories[0].total, Decimal::MAX);
    assert_eq!(agg.categories[0].percent, 100.0);
    assert_eq!(agg.daily[0].total, Decimal::MAX);

    let tiny = monthly_aggregate(
        &[tx(Category::Food, "0.0000000000000000000000000001", "2024-10-05 09:00")],
        nov().previous(),
    );
    assert_eq!(month_over_month_change(&agg, Some(&tiny)), None);
}
