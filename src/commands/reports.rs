// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::aggregate::with_previous;
use crate::fx::RateResolver;
use crate::models::{Month, MonthlyAggregate};
use crate::store::{RateCacheStore, SettingsProvider, TransactionStore};
use crate::utils::{fmt_money, parse_currency, parse_month, pretty_table, required};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("month", sub)) => month(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct MonthReport {
    /// `None` when amounts are summed in their stored currencies.
    pub currency: Option<String>,
    pub current: MonthlyAggregate,
    pub previous_total: rust_decimal::Decimal,
    pub month_over_month_change: Option<f64>,
}

/// Aggregates `month` and its predecessor, converting into `currency` first if given.
pub fn build_month_report(
    transactions: &dyn TransactionStore,
    cache: &dyn RateCacheStore,
    settings: &dyn SettingsProvider,
    month: Month,
    currency: Option<&str>,
) -> Result<MonthReport> {
    let previous = month.previous();
    let mut snapshot: Vec<_> = transactions
        .all_transactions()?
        .into_iter()
        .filter(|t| {
            let day = t.timestamp.date();
            month.contains(day) || previous.contains(day)
        })
        .collect();
    let currency = currency.map(parse_currency).transpose()?;
    if let Some(ccy) = &currency {
        snapshot = RateResolver::new(cache, settings).convert_transactions(&snapshot, ccy)?;
    }
    let (current, previous, change) = with_previous(&snapshot, month);
    Ok(MonthReport {
        currency,
        current,
        previous_total: previous.total_expenses,
        month_over_month_change: change,
    })
}

fn month(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let month = parse_month(required(sub, "month")?)?;
    let currency = sub.get_one::<String>("currency").map(String::as_str);
    let report = build_month_report(conn, conn, conn, month, currency)?;

    if sub.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let ccy = report.currency.as_deref().unwrap_or("");
    let agg = &report.current;
    let change = match report.month_over_month_change {
        Some(c) => format!("{:+.1}%", c),
        None => "n/a".to_string(),
    };
    println!(
        "{}",
        pretty_table(
            &["Month", "Total", "Count", "Avg/day", "Avg/week", "vs previous"],
            vec![vec![
                agg.month.to_string(),
                fmt_money(&agg.total_expenses, ccy),
                agg.transaction_count.to_string(),
                fmt_money(&agg.average_daily, ccy),
                fmt_money(&agg.average_weekly, ccy),
                change,
            ]],
        )
    );

    let cats = agg
        .categories
        .iter()
        .map(|c| {
            vec![
                c.category.to_string(),
                fmt_money(&c.total, ccy),
                format!("{:.1}%", c.percent),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Category", "Spent", "Share"], cats));

    let weeks = agg
        .weekly
        .iter()
        .map(|w| vec![format!("W{}", w.week_of_month), fmt_money(&w.total, ccy)])
        .collect();
    println!("{}", pretty_table(&["Week", "Spent"], weeks));

    let days = agg
        .daily
        .iter()
        .map(|d| {
            let breakdown = d
                .category_totals
                .iter()
                .map(|(c, v)| format!("{}: {}", c, v.round_dp(2)))
                .collect::<Vec<_>>()
                .join(", ");
            vec![d.date.to_string(), fmt_money(&d.total, ccy), breakdown]
        })
        .collect();
    println!("{}", pretty_table(&["Day", "Spent", "Breakdown"], days));
    Ok(())
}
