// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Monthly, weekly, daily and per-category rollups of a transaction snapshot.
//!
//! Everything here is a pure function of its inputs. Amounts are summed as
//! stored; re-denominate through [`crate::fx::RateResolver`] first when the
//! snapshot mixes currencies. Sums saturate at `Decimal::MAX`.

use crate::models::{
    Category, CategoryTotal, DailyAggregate, Month, MonthlyAggregate, Transaction,
    WeeklyAggregate,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;

pub fn monthly_aggregate(transactions: &[Transaction], month: Month) -> MonthlyAggregate {
    let in_month: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| month.contains(t.timestamp.date()))
        .collect();

    let mut total = Decimal::ZERO;
    let mut by_category: BTreeMap<Category, Decimal> = BTreeMap::new();
    let mut by_week: BTreeMap<u32, Decimal> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, BTreeMap<Category, Decimal>> = BTreeMap::new();

    for t in &in_month {
        let date = t.timestamp.date();
        total = total.saturating_add(t.amount);
        add_to(by_category.entry(t.category).or_insert(Decimal::ZERO), t.amount);
        add_to(
            by_week
                .entry(month.week_of_month(date))
                .or_insert(Decimal::ZERO),
            t.amount,
        );
        add_to(
            by_day
                .entry(date)
                .or_default()
                .entry(t.category)
                .or_insert(Decimal::ZERO),
            t.amount,
        );
    }

    let mut categories: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, sum)| CategoryTotal {
            category,
            total: sum,
            percent: percent_of(sum, total),
        })
        .collect();
    // Largest spend first; BTreeMap order breaks ties.
    categories.sort_by(|a, b| b.total.cmp(&a.total));

    let weekly = by_week
        .into_iter()
        .map(|(week_of_month, total)| WeeklyAggregate {
            week_of_month,
            total,
        })
        .collect();

    let daily = by_day
        .into_iter()
        .map(|(date, cats)| DailyAggregate {
            date,
            total: cats
                .values()
                .fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v)),
            category_totals: cats.into_iter().filter(|(_, v)| !v.is_zero()).collect(),
        })
        .collect();

    MonthlyAggregate {
        month,
        total_expenses: total,
        transaction_count: in_month.len(),
        average_daily: total / Decimal::from(month.days()),
        average_weekly: total / Decimal::from(month.weeks_overlapping()),
        categories,
        weekly,
        daily,
    }
}

/// Percentage change from `previous` to `current`; positive means more spend.
///
/// `None` when there is no baseline: no previous month, or a previous total of 0.
pub fn month_over_month_change(
    current: &MonthlyAggregate,
    previous: Option<&MonthlyAggregate>,
) -> Option<f64> {
    let prev = previous?.total_expenses;
    if prev.is_zero() {
        return None;
    }
    current
        .total_expenses
        .checked_sub(prev)?
        .checked_div(prev)?
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_f64()
}

/// The aggregate for `month`, the one before it, and the change between them.
pub fn with_previous(
    transactions: &[Transaction],
    month: Month,
) -> (MonthlyAggregate, MonthlyAggregate, Option<f64>) {
    let current = monthly_aggregate(transactions, month);
    let previous = monthly_aggregate(transactions, month.previous());
    let change = month_over_month_change(&current, Some(&previous));
    (current, previous, change)
}

fn add_to(slot: &mut Decimal, amount: Decimal) {
    *slot = slot.saturating_add(amount);
}

fn percent_of(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    part.checked_div(whole)
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|p| p.to_f64())
        .unwrap_or(0.0)
}
