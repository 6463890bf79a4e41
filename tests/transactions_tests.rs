// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use spendwise::models::{Category, Transaction};
use spendwise::store::TransactionStore;
use spendwise::utils::{parse_datetime, set_setting};
use spendwise::{cli, commands::transactions, db};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    for (i, cat) in [Category::Food, Category::Travel, Category::Food]
        .into_iter()
        .enumerate()
    {
        conn.insert_transaction(&Transaction {
            id: format!("t{}", i + 1),
            amount: Decimal::from(10),
            currency: "USD".into(),
            category: cat,
            description: "lunch".into(),
            timestamp: parse_datetime(&format!("2025-01-0{} 12:00", i + 1)).unwrap(),
        })
        .unwrap();
    }
    conn
}

fn sub_matches(args: &[&str]) -> clap::ArgMatches {
    let matches = cli::build_cli().get_matches_from(args.iter().copied());
    let (_, tx_m) = matches.subcommand().expect("no subcommand");
    let (_, leaf) = tx_m.subcommand().expect("no tx subcommand");
    leaf.clone()
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    let list_m = sub_matches(&["spendwise", "tx", "list", "--limit", "2"]);
    let rows = transactions::query_rows(&conn, &list_m).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "t3");
}

#[test]
fn list_filters_by_category_and_month() {
    let conn = setup();
    let list_m = sub_matches(&["spendwise", "tx", "list", "--category", "food"]);
    let rows = transactions::query_rows(&conn, &list_m).unwrap();
    assert_eq!(
        rows.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        vec!["t3", "t1"]
    );

    let list_m = sub_matches(&["spendwise", "tx", "list", "--month", "2024-12"]);
    assert!(transactions::query_rows(&conn, &list_m).unwrap().is_empty());
}

#[test]
fn add_defaults_currency_to_base() {
    let conn = setup();
    set_setting(&conn, "base_currency", "EUR").unwrap();
    let add_m = sub_matches(&[
        "spendwise", "tx", "add", "--amount", "12.50", "--category", "utilities", "--at",
        "2025-02-03 07:45", "--desc", "power",
    ]);
    let tx = transactions::from_args(&conn, &add_m).unwrap();
    assert_eq!(tx.currency, "EUR");
    assert_eq!(tx.category, Category::Utilities);
    assert_eq!(tx.amount, "12.50".parse::<Decimal>().unwrap());
    assert_eq!(tx.description, "power");
    assert!(!tx.id.is_empty());

    conn.insert_transaction(&tx).unwrap();
    assert_eq!(conn.find_transaction(&tx.id).unwrap(), Some(tx));
}

#[test]
fn add_rejects_negative_and_bad_currency() {
    let conn = setup();
    let add_m = sub_matches(&[
        "spendwise", "tx", "add", "--amount=-3", "--category", "food",
    ]);
    assert!(transactions::from_args(&conn, &add_m).is_err());

    let add_m = sub_matches(&[
        "spendwise", "tx", "add", "--amount", "3", "--category", "food", "--currency", "dollars",
    ]);
    assert!(transactions::from_args(&conn, &add_m).is_err());
}

#[test]
fn edit_replaces_whole_record_under_same_id() {
    let conn = setup();
    let existing = conn.find_transaction("t2").unwrap().unwrap();
    let edit_m = sub_matches(&[
        "spendwise", "tx", "edit", "t2", "--amount", "42", "--currency", "gbp",
    ]);
    let updated = transactions::apply_edits(&existing, &edit_m).unwrap();
    assert!(conn.update_transaction(&updated).unwrap());

    let stored = conn.find_transaction("t2").unwrap().unwrap();
    assert_eq!(stored.amount, Decimal::from(42));
    assert_eq!(stored.currency, "GBP");
    assert_eq!(stored.category, Category::Travel);
    assert_eq!(stored.timestamp, existing.timestamp);
    assert_eq!(conn.all_transactions().unwrap().len(), 3);
}

#[test]
fn unknown_ids_are_reported() {
    let conn = setup();
    let ghost = Transaction {
        id: "ghost".into(),
        ..conn.find_transaction("t1").unwrap().unwrap()
    };
    assert!(!conn.update_transaction(&ghost).unwrap());
    assert!(!conn.delete_transaction("ghost").unwrap());
    assert!(conn.delete_transaction("t1").unwrap());
    assert_eq!(conn.find_transaction("t1").unwrap(), None);
}
