// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use spendwise::commands::{doctor, reports::build_month_report};
use spendwise::error::ConversionError;
use spendwise::models::{CachedRate, Category, Transaction};
use spendwise::store::{RateCacheStore, TransactionStore};
use spendwise::utils::{parse_datetime, parse_month, set_setting};
use spendwise::db;

fn add(conn: &Connection, id: &str, amount: &str, ccy: &str, when: &str) {
    conn.insert_transaction(&Transaction {
        id: id.into(),
        amount: amount.parse::<Decimal>().unwrap(),
        currency: ccy.into(),
        category: Category::Food,
        description: String::new(),
        timestamp: parse_datetime(when).unwrap(),
    })
    .unwrap();
}

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    set_setting(&conn, "base_currency", "USD").unwrap();
    conn.upsert_many(&[CachedRate {
        base_currency: "USD".into(),
        target_currency: "EUR".into(),
        rate: 0.5,
        date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
        last_fetched_at: "2024-11-01 09:00:00".into(),
    }])
    .unwrap();
    add(&conn, "oct", "40", "USD", "2024-10-20 12:00");
    add(&conn, "nov-usd", "30", "USD", "2024-11-02 12:00");
    add(&conn, "nov-eur", "10", "EUR", "2024-11-03 12:00");
    conn
}

#[test]
fn report_converts_before_aggregating() {
    let conn = setup();
    let month = parse_month("2024-11").unwrap();
    let report = build_month_report(&conn, &conn, &conn, month, Some("usd")).unwrap();

    assert_eq!(report.currency.as_deref(), Some("USD"));
    // 10 EUR at 1 USD = 0.5 EUR is 20 USD.
    assert_eq!(report.current.total_expenses, Decimal::from(50));
    assert_eq!(report.previous_total, Decimal::from(40));
    assert_eq!(report.month_over_month_change, Some(25.0));
}

#[test]
fn report_without_currency_sums_as_stored() {
    let conn = setup();
    let month = parse_month("2024-11").unwrap();
    let report = build_month_report(&conn, &conn, &conn, month, None).unwrap();
    assert_eq!(report.currency, None);
    assert_eq!(report.current.total_expenses, Decimal::from(40));
    assert_eq!(report.month_over_month_change, Some(0.0));
}

#[test]
fn report_refuses_unresolvable_currency() {
    let conn = setup();
    add(&conn, "nov-krw", "1000", "KRW", "2024-11-04 12:00");
    let month = parse_month("2024-11").unwrap();
    let err = build_month_report(&conn, &conn, &conn, month, Some("USD")).unwrap_err();
    match err.downcast_ref::<ConversionError>() {
        Some(ConversionError::RateUnavailable { from, to }) => {
            assert_eq!(from, "KRW");
            assert_eq!(to, "USD");
        }
        Some(ConversionError::Overflow { .. }) | None => panic!("unexpected error: {err:#}"),
    }
}

#[test]
fn doctor_flags_missing_rates_and_staleness() {
    let conn = setup();
    add(&conn, "nov-krw", "1000", "KRW", "2024-11-04 12:00");

    let fresh = parse_datetime("2024-11-01 12:00").unwrap();
    let rows = doctor::diagnose(&conn, &conn, &conn, fresh).unwrap();
    assert_eq!(rows, vec![vec!["missing_fx".to_string(), "KRW -> USD".to_string()]]);

    let later = parse_datetime("2024-11-03 12:00").unwrap();
    let rows = doctor::diagnose(&conn, &conn, &conn, later).unwrap();
    assert_eq!(rows[0], vec!["stale_rates".to_string(), "USD".to_string()]);
    assert_eq!(rows.len(), 2);
}
