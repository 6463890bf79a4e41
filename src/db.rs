// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Spendwise", "spendwise"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("spendwise.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    open_at(&db_path()?)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS transactions(
        id TEXT PRIMARY KEY,
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        category TEXT NOT NULL CHECK(category IN ('FOOD','TRAVEL','UTILITIES','OTHER')),
        description TEXT NOT NULL DEFAULT '',
        timestamp TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);

    -- 1 base = rate target, one row per (base, target, date)
    CREATE TABLE IF NOT EXISTS cached_rates(
        base TEXT NOT NULL,
        target TEXT NOT NULL,
        date TEXT NOT NULL,
        rate REAL NOT NULL,
        last_fetched_at TEXT NOT NULL,
        PRIMARY KEY(base, target, date)
    );
    CREATE INDEX IF NOT EXISTS idx_cached_rates_fetched ON cached_rates(base, last_fetched_at);

    CREATE TABLE IF NOT EXISTS rate_refreshes(
        base TEXT PRIMARY KEY,
        refreshed_at TEXT NOT NULL
    );
    "#,
    )?;
    Ok(())
}
