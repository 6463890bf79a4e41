// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::fx::{HttpRateSource, PRUNE_AFTER_DAYS, RateResolver};
use crate::store::{RateCacheStore, RemoteRateSource, SettingsProvider};
use crate::utils::{
    maybe_print_json, parse_currency, parse_date, parse_decimal, pretty_table, required,
    set_setting,
};
use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set-base", sub)) => {
            let ccy = parse_currency(required(sub, "currency")?)?;
            set_setting(conn, "base_currency", &ccy)?;
            println!("Base currency set to {}", ccy);
        }
        Some(("refresh", sub)) => {
            let source = HttpRateSource::new()?;
            refresh(conn, &source, sub)?;
        }
        Some(("status", _)) => status(conn)?,
        Some(("list", sub)) => list_rates(conn, sub)?,
        Some(("convert", sub)) => convert_amount(conn, sub)?,
        Some(("prune", sub)) => {
            let days = *sub.get_one::<i64>("days").unwrap_or(&PRUNE_AFTER_DAYS);
            let removed = RateResolver::new(conn, conn).prune_older_than(days);
            println!("Removed {} cached rate(s) older than {} days", removed, days);
        }
        _ => {}
    }
    Ok(())
}

/// Refreshes the chosen base when stale (or forced), then prunes old rows.
/// Returns whether the network was consulted.
pub fn refresh(
    conn: &Connection,
    source: &dyn RemoteRateSource,
    sub: &clap::ArgMatches,
) -> Result<bool> {
    let base = match sub.get_one::<String>("base") {
        Some(b) => parse_currency(b)?,
        None => conn.base_currency()?,
    };
    let api_key = match sub.get_one::<String>("api-key") {
        Some(k) => k.clone(),
        None => conn.fx_api_key()?,
    };
    let api_url = conn.fx_api_url()?;
    let resolver = RateResolver::new(conn, conn);

    if !sub.get_flag("force") && !resolver.is_stale(&base)? {
        println!("{} rates are fresh; use --force to refresh anyway.", base);
        return Ok(false);
    }
    let count = resolver.refresh(source, &api_key, &base, &api_url)?;
    println!("Fetched {} rate(s) for base {}", count, base);
    let pruned = resolver.prune_older_than(PRUNE_AFTER_DAYS);
    info!(pruned, "Post-refresh prune");
    Ok(true)
}

fn status(conn: &Connection) -> Result<()> {
    let resolver = RateResolver::new(conn, conn);
    let preferred = conn.base_currency()?;
    let mut bases = conn.distinct_base_currencies()?;
    if !bases.contains(&preferred) {
        bases.insert(0, preferred.clone());
    }
    let mut data = Vec::new();
    for base in bases {
        let state = if resolver.is_stale(&base)? {
            "stale"
        } else {
            "fresh"
        };
        let last = conn.last_refresh(&base)?.unwrap_or_else(|| "never".into());
        let marker = if base == preferred { " (preferred)" } else { "" };
        data.push(vec![format!("{}{}", base, marker), state.into(), last]);
    }
    println!("{}", pretty_table(&["Base", "State", "Last refresh"], data));
    Ok(())
}

fn list_rates(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let limit = *sub.get_one::<usize>("limit").unwrap_or(&50);
    let rates = conn.list_rates(limit)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rates)? {
        let data = rates
            .into_iter()
            .map(|r| {
                vec![
                    r.date.to_string(),
                    r.base_currency,
                    r.target_currency,
                    format!("{:.6}", r.rate),
                    r.last_fetched_at,
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Date", "Base", "Target", "Rate", "Fetched"], data)
        );
    }
    Ok(())
}

fn convert_amount(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(required(sub, "amount")?)?;
    let from = parse_currency(required(sub, "from")?)?;
    let to = parse_currency(required(sub, "to")?)?;
    let date = sub
        .get_one::<String>("date")
        .map(|d| parse_date(d))
        .transpose()?;
    let resolver = RateResolver::new(conn, conn);
    match resolver.resolve_rate(&from, &to, date)? {
        Some(rate) => {
            let res = resolver.convert(amount, &from, &to, date)?;
            println!("{} {} -> {:.4} {} (rate {:.6})", amount, from, res, to, rate);
        }
        None => println!("{} -> {}: rate unavailable", from, to),
    }
    Ok(())
}
