// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Category, Transaction};
use crate::store::{SettingsProvider, TransactionStore};
use crate::utils::{
    maybe_print_json, parse_currency, parse_datetime, parse_decimal, parse_month, pretty_table,
    required,
};
use anyhow::{Result, bail};
use chrono::Local;
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => remove(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn parse_amount(s: &str) -> Result<Decimal> {
    let amount = parse_decimal(s)?;
    if amount.is_sign_negative() {
        bail!("Amount must not be negative, got {}", amount);
    }
    Ok(amount)
}

/// Builds a new transaction from `tx add` arguments.
pub fn from_args(
    settings: &dyn SettingsProvider,
    sub: &clap::ArgMatches,
) -> Result<Transaction> {
    let amount = parse_amount(required(sub, "amount")?)?;
    let category = required(sub, "category")?.parse::<Category>()?;
    let currency = match sub.get_one::<String>("currency") {
        Some(c) => parse_currency(c)?,
        None => settings.base_currency()?,
    };
    let timestamp = match sub.get_one::<String>("at") {
        Some(s) => parse_datetime(s)?,
        None => Local::now().naive_local(),
    };
    Ok(Transaction {
        id: Uuid::new_v4().to_string(),
        amount,
        currency,
        category,
        description: sub
            .get_one::<String>("description")
            .cloned()
            .unwrap_or_default(),
        timestamp,
    })
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tx = from_args(conn, sub)?;
    conn.insert_transaction(&tx)?;
    println!(
        "Recorded {} {} ({}) on {} [{}]",
        tx.amount,
        tx.currency,
        tx.category,
        tx.timestamp.format("%Y-%m-%d %H:%M"),
        tx.id
    );
    Ok(())
}

/// Applies whichever fields `tx edit` was given on top of `existing`.
pub fn apply_edits(existing: &Transaction, sub: &clap::ArgMatches) -> Result<Transaction> {
    let mut tx = existing.clone();
    if let Some(a) = sub.get_one::<String>("amount") {
        tx.amount = parse_amount(a)?;
    }
    if let Some(c) = sub.get_one::<String>("currency") {
        tx.currency = parse_currency(c)?;
    }
    if let Some(k) = sub.get_one::<String>("category") {
        tx.category = k.parse()?;
    }
    if let Some(d) = sub.get_one::<String>("description") {
        tx.description = d.clone();
    }
    if let Some(at) = sub.get_one::<String>("at") {
        tx.timestamp = parse_datetime(at)?;
    }
    Ok(tx)
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = required(sub, "id")?;
    let Some(existing) = conn.find_transaction(id)? else {
        bail!("Transaction '{}' not found", id);
    };
    let updated = apply_edits(&existing, sub)?;
    if updated == existing {
        println!("Nothing to change for {}", id);
        return Ok(());
    }
    conn.update_transaction(&updated)?;
    debug!(%id, "Replaced transaction");
    println!("Updated {}", id);
    Ok(())
}

fn remove(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = required(sub, "id")?;
    if !conn.delete_transaction(id)? {
        bail!("Transaction '{}' not found", id);
    }
    println!("Deleted {}", id);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|t| {
                vec![
                    t.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    t.category.to_string(),
                    t.amount.to_string(),
                    t.currency.clone(),
                    t.description.clone(),
                    t.id.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["When", "Category", "Amount", "CCY", "Description", "Id"],
                rows,
            )
        );
    }
    Ok(())
}

/// Newest first, filtered by the optional `--month`, `--category` and `--limit`.
pub fn query_rows(store: &dyn TransactionStore, sub: &clap::ArgMatches) -> Result<Vec<Transaction>> {
    let month = sub
        .get_one::<String>("month")
        .map(|m| parse_month(m))
        .transpose()?;
    let category = sub
        .get_one::<String>("category")
        .map(|c| c.parse::<Category>())
        .transpose()?;

    let mut data: Vec<Transaction> = store
        .all_transactions()?
        .into_iter()
        .filter(|t| month.is_none_or(|m| m.contains(t.timestamp.date())))
        .filter(|t| category.is_none_or(|c| t.category == c))
        .collect();
    data.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
    if let Some(limit) = sub.get_one::<usize>("limit") {
        data.truncate(*limit);
    }
    Ok(data)
}
