// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Collaborator seams used by the resolver, the aggregator and the CLI,
//! together with their SQLite implementations on [`rusqlite::Connection`].

use crate::error::RefreshError;
use crate::models::{CachedRate, Category, RatePayload, Transaction};
use crate::utils::{get_setting, parse_decimal};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub const DEFAULT_BASE_CURRENCY: &str = "USD";
pub const DEFAULT_FX_API_URL: &str = "https://v6.exchangerate-api.com/v6";
pub const FX_API_KEY_ENV: &str = "SPENDWISE_FX_API_KEY";

pub trait TransactionStore {
    fn all_transactions(&self) -> Result<Vec<Transaction>>;
    fn find_transaction(&self, id: &str) -> Result<Option<Transaction>>;
    fn insert_transaction(&self, tx: &Transaction) -> Result<()>;
    /// Replaces the stored transaction with the same id. Returns false if none exists.
    fn update_transaction(&self, tx: &Transaction) -> Result<bool>;
    fn delete_transaction(&self, id: &str) -> Result<bool>;
}

pub trait RateCacheStore {
    /// Exact `date` match, or the most recent row for the pair when `date` is `None`.
    fn get_rate(&self, base: &str, target: &str, date: Option<NaiveDate>)
    -> Result<Option<CachedRate>>;
    /// Last writer wins per (base, target, date). All rows land or none do.
    fn upsert_many(&self, rates: &[CachedRate]) -> Result<()>;
    /// `upsert_many` plus stamping `base`'s last refresh, in one transaction.
    fn upsert_refresh(&self, base: &str, rates: &[CachedRate], at: NaiveDateTime) -> Result<()>;
    fn delete_older_than(&self, date: NaiveDate) -> Result<usize>;
    /// Most recently fetched base first.
    fn distinct_base_currencies(&self) -> Result<Vec<String>>;
    fn most_recent_by_base(&self, base: &str) -> Result<Option<CachedRate>>;
    fn last_refresh(&self, base: &str) -> Result<Option<String>>;
    fn list_rates(&self, limit: usize) -> Result<Vec<CachedRate>>;
}

pub trait SettingsProvider {
    fn base_currency(&self) -> Result<String>;
    fn fx_api_key(&self) -> Result<String>;
    fn fx_api_url(&self) -> Result<String>;
}

pub trait RemoteRateSource {
    fn fetch_latest(
        &self,
        api_key: &str,
        base_currency: &str,
        api_base_url: &str,
    ) -> Result<RatePayload, RefreshError>;
}

type RawTransaction = (String, String, String, String, String, NaiveDateTime);

fn raw_transaction(r: &Row<'_>) -> rusqlite::Result<RawTransaction> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
    ))
}

fn into_transaction(raw: RawTransaction) -> Result<Transaction> {
    let (id, amount, currency, category, description, timestamp) = raw;
    Ok(Transaction {
        amount: parse_decimal(&amount)
            .with_context(|| format!("Corrupt amount on transaction {}", id))?,
        category: category
            .parse::<Category>()
            .with_context(|| format!("Corrupt category on transaction {}", id))?,
        id,
        currency,
        description,
        timestamp,
    })
}

const TX_COLUMNS: &str = "id, amount, currency, category, description, timestamp";

impl TransactionStore for Connection {
    fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {TX_COLUMNS} FROM transactions ORDER BY timestamp, id"
        ))?;
        let rows = stmt.query_map([], raw_transaction)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(into_transaction(row?)?);
        }
        Ok(out)
    }

    fn find_transaction(&self, id: &str) -> Result<Option<Transaction>> {
        let raw = self
            .query_row(
                &format!("SELECT {TX_COLUMNS} FROM transactions WHERE id=?1"),
                params![id],
                raw_transaction,
            )
            .optional()?;
        raw.map(into_transaction).transpose()
    }

    fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        self.execute(
            "INSERT INTO transactions(id, amount, currency, category, description, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                tx.id,
                tx.amount.to_string(),
                tx.currency,
                tx.category.as_str(),
                tx.description,
                tx.timestamp
            ],
        )
        .with_context(|| format!("Insert transaction {}", tx.id))?;
        Ok(())
    }

    fn update_transaction(&self, tx: &Transaction) -> Result<bool> {
        let n = self.execute(
            "UPDATE transactions SET amount=?2, currency=?3, category=?4, description=?5, timestamp=?6
             WHERE id=?1",
            params![
                tx.id,
                tx.amount.to_string(),
                tx.currency,
                tx.category.as_str(),
                tx.description,
                tx.timestamp
            ],
        )?;
        Ok(n > 0)
    }

    fn delete_transaction(&self, id: &str) -> Result<bool> {
        let n = self.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
        Ok(n > 0)
    }
}

fn cached_rate(r: &Row<'_>) -> rusqlite::Result<CachedRate> {
    Ok(CachedRate {
        base_currency: r.get(0)?,
        target_currency: r.get(1)?,
        date: r.get(2)?,
        rate: r.get(3)?,
        last_fetched_at: r.get(4)?,
    })
}

const RATE_COLUMNS: &str = "base, target, date, rate, last_fetched_at";

fn write_rates(conn: &Connection, rates: &[CachedRate]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO cached_rates(base, target, date, rate, last_fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(base, target, date) DO UPDATE SET
            rate=excluded.rate, last_fetched_at=excluded.last_fetched_at",
    )?;
    for r in rates {
        stmt.execute(params![
            r.base_currency,
            r.target_currency,
            r.date,
            r.rate,
            r.last_fetched_at
        ])?;
    }
    Ok(())
}

impl RateCacheStore for Connection {
    fn get_rate(
        &self,
        base: &str,
        target: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<CachedRate>> {
        let found = match date {
            Some(d) => self
                .query_row(
                    &format!(
                        "SELECT {RATE_COLUMNS} FROM cached_rates WHERE base=?1 AND target=?2 AND date=?3"
                    ),
                    params![base, target, d],
                    cached_rate,
                )
                .optional()?,
            None => self
                .query_row(
                    &format!(
                        "SELECT {RATE_COLUMNS} FROM cached_rates WHERE base=?1 AND target=?2
                         ORDER BY date DESC, last_fetched_at DESC LIMIT 1"
                    ),
                    params![base, target],
                    cached_rate,
                )
                .optional()?,
        };
        Ok(found)
    }

    fn upsert_many(&self, rates: &[CachedRate]) -> Result<()> {
        let tx = self.unchecked_transaction()?;
        write_rates(&tx, rates)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_refresh(&self, base: &str, rates: &[CachedRate], at: NaiveDateTime) -> Result<()> {
        let tx = self.unchecked_transaction()?;
        write_rates(&tx, rates)?;
        tx.execute(
            "INSERT INTO rate_refreshes(base, refreshed_at) VALUES (?1, ?2)
             ON CONFLICT(base) DO UPDATE SET refreshed_at=excluded.refreshed_at",
            params![base, at.format(crate::fx::FETCHED_AT_FORMAT).to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_older_than(&self, date: NaiveDate) -> Result<usize> {
        Ok(self.execute("DELETE FROM cached_rates WHERE date < ?1", params![date])?)
    }

    fn distinct_base_currencies(&self) -> Result<Vec<String>> {
        let mut stmt = self.prepare(
            "SELECT base FROM cached_rates GROUP BY base ORDER BY MAX(last_fetched_at) DESC, base",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn most_recent_by_base(&self, base: &str) -> Result<Option<CachedRate>> {
        Ok(self
            .query_row(
                &format!(
                    "SELECT {RATE_COLUMNS} FROM cached_rates WHERE base=?1
                     ORDER BY last_fetched_at DESC LIMIT 1"
                ),
                params![base],
                cached_rate,
            )
            .optional()?)
    }

    fn last_refresh(&self, base: &str) -> Result<Option<String>> {
        Ok(self
            .query_row(
                "SELECT refreshed_at FROM rate_refreshes WHERE base=?1",
                params![base],
                |r| r.get(0),
            )
            .optional()?)
    }

    fn list_rates(&self, limit: usize) -> Result<Vec<CachedRate>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {RATE_COLUMNS} FROM cached_rates ORDER BY date DESC, base, target LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], cached_rate)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl SettingsProvider for Connection {
    fn base_currency(&self) -> Result<String> {
        Ok(get_setting(self, "base_currency")?
            .unwrap_or_else(|| DEFAULT_BASE_CURRENCY.to_string()))
    }

    fn fx_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(FX_API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }
        Ok(get_setting(self, "fx_api_key")?.unwrap_or_default())
    }

    fn fx_api_url(&self) -> Result<String> {
        Ok(get_setting(self, "fx_api_url")?.unwrap_or_else(|| DEFAULT_FX_API_URL.to_string()))
    }
}
