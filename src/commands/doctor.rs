// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::fx::RateResolver;
use crate::store::{RateCacheStore, SettingsProvider, TransactionStore};
use crate::utils::pretty_table;
use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::collections::BTreeSet;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = diagnose(conn, conn, conn, chrono::Local::now().naive_local())?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Currencies that cannot be resolved to the base, and whether the base is stale.
pub fn diagnose(
    transactions: &dyn TransactionStore,
    cache: &dyn RateCacheStore,
    settings: &dyn SettingsProvider,
    now: NaiveDateTime,
) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let base = settings.base_currency()?;
    let resolver = RateResolver::new(cache, settings);

    if resolver.is_stale_at(&base, now)? {
        rows.push(vec!["stale_rates".into(), base.clone()]);
    }

    let currencies: BTreeSet<String> = transactions
        .all_transactions()?
        .into_iter()
        .map(|t| t.currency)
        .filter(|c| c != &base)
        .collect();
    for ccy in currencies {
        if resolver.resolve_rate(&ccy, &base, None)?.is_none() {
            rows.push(vec!["missing_fx".into(), format!("{} -> {}", ccy, base)]);
        }
    }
    Ok(rows)
}
