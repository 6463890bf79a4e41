// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store::TransactionStore;
use crate::utils::required;
use anyhow::{Result, bail};
use rusqlite::Connection;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => {
            let fmt = required(sub, "format")?.to_lowercase();
            let out = required(sub, "out")?;
            let n = export_transactions(conn, &fmt, Path::new(out))?;
            println!("Exported {} transactions to {}", n, out);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Writes every transaction, oldest first, as `csv` or `json`.
pub fn export_transactions(store: &dyn TransactionStore, fmt: &str, out: &Path) -> Result<usize> {
    let rows = store.all_transactions()?;
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "timestamp",
                "amount",
                "currency",
                "category",
                "description",
            ])?;
            for t in &rows {
                wtr.write_record([
                    t.id.clone(),
                    t.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    t.amount.to_string(),
                    t.currency.clone(),
                    t.category.to_string(),
                    t.description.clone(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(rows.len())
}
