// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Cross-rate resolution over the local rate cache, cache staleness and
//! maintenance, and refreshing the cache from a remote source.

use crate::error::{ConversionError, RefreshError};
use crate::models::{CachedRate, RatePayload, Transaction};
use crate::store::{RateCacheStore, RemoteRateSource, SettingsProvider};
use crate::utils::{http_client, parse_currency};
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const FETCHED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const STALE_AFTER_HOURS: i64 = 24;
pub const PRUNE_AFTER_DAYS: i64 = 30;

type Strategy<'a> = fn(&RateResolver<'a>, &str, &str, Option<NaiveDate>) -> Result<Option<f64>>;

pub struct RateResolver<'a> {
    cache: &'a dyn RateCacheStore,
    settings: &'a dyn SettingsProvider,
}

impl<'a> RateResolver<'a> {
    pub fn new(cache: &'a dyn RateCacheStore, settings: &'a dyn SettingsProvider) -> Self {
        Self { cache, settings }
    }

    /// How many units of `to` one unit of `from` buys, optionally as of `date`.
    ///
    /// `Ok(None)` means no strategy could produce a rate. Callers must not
    /// read that as a rate of 0 or 1.
    pub fn resolve_rate(
        &self,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<f64>> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if from == to {
            return Ok(Some(1.0));
        }

        let strategies: [(&str, Strategy<'a>); 4] = [
            ("direct", Self::direct),
            ("reverse", Self::reverse),
            ("preferred_base", Self::via_preferred_base),
            ("any_cached_base", Self::via_any_cached_base),
        ];
        for (name, strategy) in strategies {
            if let Some(rate) = strategy(self, &from, &to, date)? {
                debug!(%from, %to, strategy = name, rate, "Resolved rate");
                return Ok(Some(rate));
            }
        }
        debug!(%from, %to, ?date, "No rate available");
        Ok(None)
    }

    /// Converts `amount` or fails with [`ConversionError::RateUnavailable`].
    ///
    /// A rate too small to represent as a `Decimal` counts as unavailable, and
    /// a product past `Decimal::MAX` fails with [`ConversionError::Overflow`].
    pub fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<Decimal> {
        let unavailable = || ConversionError::RateUnavailable {
            from: from.to_uppercase(),
            to: to.to_uppercase(),
        };
        let rate = self.resolve_rate(from, to, date)?.ok_or_else(unavailable)?;
        if rate == 1.0 {
            return Ok(amount);
        }
        let exact = Decimal::try_from(rate).map_err(|_| unavailable())?;
        if exact.is_zero() && rate != 0.0 {
            warn!(%from, %to, rate, "Rate below decimal precision");
            return Err(unavailable().into());
        }
        let converted = amount
            .checked_mul(exact)
            .ok_or_else(|| ConversionError::Overflow {
                amount: amount.to_string(),
                from: from.to_uppercase(),
                to: to.to_uppercase(),
            })?;
        Ok(converted)
    }

    /// Re-denominates every transaction into `to`, each at its own date's rate.
    pub fn convert_transactions(
        &self,
        transactions: &[Transaction],
        to: &str,
    ) -> Result<Vec<Transaction>> {
        let to = to.trim().to_uppercase();
        transactions
            .iter()
            .map(|t| {
                let amount =
                    self.convert(t.amount, &t.currency, &to, Some(t.timestamp.date()))?;
                Ok(Transaction {
                    amount,
                    currency: to.clone(),
                    ..t.clone()
                })
            })
            .collect()
    }

    /// Date-specific row first, then the latest row for the pair.
    fn lookup(&self, base: &str, target: &str, date: Option<NaiveDate>) -> Result<Option<f64>> {
        if let Some(d) = date {
            if let Some(hit) = self.cache.get_rate(base, target, Some(d))? {
                return Ok(Some(hit.rate));
            }
        }
        Ok(self.cache.get_rate(base, target, None)?.map(|r| r.rate))
    }

    fn direct(&self, from: &str, to: &str, date: Option<NaiveDate>) -> Result<Option<f64>> {
        self.lookup(from, to, date)
    }

    fn reverse(&self, from: &str, to: &str, date: Option<NaiveDate>) -> Result<Option<f64>> {
        Ok(self
            .lookup(to, from, date)?
            .filter(|r| *r != 0.0)
            .map(|r| 1.0 / r))
    }

    fn via_preferred_base(
        &self,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<f64>> {
        let hub = self.settings.base_currency()?.trim().to_uppercase();
        self.triangulate(&hub, from, to, date)
    }

    fn via_any_cached_base(
        &self,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<f64>> {
        for hub in self.cache.distinct_base_currencies()? {
            if let Some(rate) = self.triangulate(&hub, from, to, date)? {
                debug!(%hub, "Triangulated through cached base");
                return Ok(Some(rate));
            }
        }
        Ok(None)
    }

    fn triangulate(
        &self,
        hub: &str,
        from: &str,
        to: &str,
        date: Option<NaiveDate>,
    ) -> Result<Option<f64>> {
        if hub == from || hub == to {
            return Ok(None);
        }
        let Some(hub_from) = self.lookup(hub, from, date)?.filter(|r| *r != 0.0) else {
            return Ok(None);
        };
        Ok(self.lookup(hub, to, date)?.map(|hub_to| hub_to / hub_from))
    }

    pub fn is_stale(&self, base_currency: &str) -> Result<bool> {
        self.is_stale_at(base_currency, Local::now().naive_local())
    }

    /// Stale when the newest row for `base_currency` was fetched 24 or more
    /// whole hours ago, counting calendar days plus the hour-of-day delta.
    pub fn is_stale_at(&self, base_currency: &str, now: NaiveDateTime) -> Result<bool> {
        let base = base_currency.trim().to_uppercase();
        let Some(latest) = self.cache.most_recent_by_base(&base)? else {
            return Ok(true);
        };
        let Ok(fetched) = NaiveDateTime::parse_from_str(&latest.last_fetched_at, FETCHED_AT_FORMAT)
        else {
            warn!(%base, raw = %latest.last_fetched_at, "Unparsable fetch timestamp, treating as stale");
            return Ok(true);
        };
        let days = (now.date() - fetched.date()).num_days();
        let hours = days * 24 + (i64::from(now.hour()) - i64::from(fetched.hour()));
        Ok(hours >= STALE_AFTER_HOURS)
    }

    pub fn prune_older_than(&self, days: i64) -> usize {
        self.prune_older_than_at(days, Local::now().date_naive())
    }

    /// Deletes rows dated before `today - days`. Failures are logged, not returned.
    pub fn prune_older_than_at(&self, days: i64, today: NaiveDate) -> usize {
        let Some(cutoff) = TimeDelta::try_days(days).and_then(|d| today.checked_sub_signed(d))
        else {
            warn!(days, %today, "Prune window out of calendar range, nothing pruned");
            return 0;
        };
        match self.cache.delete_older_than(cutoff) {
            Ok(n) => {
                info!(%cutoff, removed = n, "Pruned cached rates");
                n
            }
            Err(e) => {
                warn!(error = %e, %cutoff, "Pruning cached rates failed");
                0
            }
        }
    }

    pub fn refresh(
        &self,
        source: &dyn RemoteRateSource,
        api_key: &str,
        base_currency: &str,
        api_base_url: &str,
    ) -> Result<usize, RefreshError> {
        self.refresh_at(
            source,
            api_key,
            base_currency,
            api_base_url,
            Local::now().naive_local(),
        )
    }

    /// Pulls every rate for `base_currency` in one call and upserts them
    /// stamped with `now`'s date. The cache is untouched on any failure.
    pub fn refresh_at(
        &self,
        source: &dyn RemoteRateSource,
        api_key: &str,
        base_currency: &str,
        api_base_url: &str,
        now: NaiveDateTime,
    ) -> Result<usize, RefreshError> {
        if api_key.trim().is_empty() {
            return Err(RefreshError::InvalidInput("API key is blank".into()));
        }
        if base_currency.trim().is_empty() {
            return Err(RefreshError::InvalidInput("base currency is blank".into()));
        }
        let base =
            parse_currency(base_currency).map_err(|e| RefreshError::InvalidInput(e.to_string()))?;

        let payload = source.fetch_latest(api_key.trim(), &base, api_base_url)?;
        if !payload.base_currency.eq_ignore_ascii_case(&base) {
            return Err(RefreshError::Remote(format!(
                "asked for {} rates but source answered for {}",
                base, payload.base_currency
            )));
        }

        let fetched_at = now.format(FETCHED_AT_FORMAT).to_string();
        let today = now.date();
        let rows: Vec<CachedRate> = payload
            .rates
            .into_iter()
            .filter(|(code, _)| !code.eq_ignore_ascii_case(&base))
            .map(|(code, rate)| CachedRate {
                base_currency: base.clone(),
                target_currency: code.to_uppercase(),
                rate,
                date: today,
                last_fetched_at: fetched_at.clone(),
            })
            .collect();
        if rows.is_empty() {
            return Err(RefreshError::Remote(format!("no rates returned for {}", base)));
        }

        self.cache
            .upsert_refresh(&base, &rows, now)
            .map_err(RefreshError::Cache)?;
        info!(%base, count = rows.len(), as_of = %payload.as_of, "Refreshed rates");
        Ok(rows.len())
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

/// Decodes a `latest` response. Non-positive and non-finite rates are dropped.
pub fn parse_payload(body: &str, fallback_as_of: NaiveDate) -> Result<RatePayload, RefreshError> {
    let resp: LatestResponse = serde_json::from_str(body)
        .map_err(|e| RefreshError::Remote(format!("malformed payload: {}", e)))?;
    if resp.result != "success" {
        return Err(RefreshError::Remote(format!(
            "source reported {}",
            resp.error_type.as_deref().unwrap_or(&resp.result)
        )));
    }
    let base_currency = resp
        .base_code
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| RefreshError::Remote("payload has no base_code".into()))?
        .to_uppercase();
    let as_of = resp
        .time_last_update_unix
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.date_naive())
        .unwrap_or(fallback_as_of);
    let rates = resp
        .conversion_rates
        .into_iter()
        .filter(|(_, r)| r.is_finite() && *r > 0.0)
        .map(|(code, r)| (code.to_uppercase(), r))
        .collect();
    Ok(RatePayload {
        base_currency,
        as_of,
        rates,
    })
}

/// `GET {api_base_url}/{api_key}/latest/{base}` over blocking reqwest.
pub struct HttpRateSource {
    client: reqwest::blocking::Client,
}

impl HttpRateSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
        })
    }
}

impl RemoteRateSource for HttpRateSource {
    fn fetch_latest(
        &self,
        api_key: &str,
        base_currency: &str,
        api_base_url: &str,
    ) -> Result<RatePayload, RefreshError> {
        if api_key.trim().is_empty() {
            return Err(RefreshError::InvalidInput("API key is blank".into()));
        }
        let url = format!(
            "{}/{}/latest/{}",
            api_base_url.trim_end_matches('/'),
            api_key.trim(),
            base_currency
        );
        debug!(base = %base_currency, "Fetching latest rates");
        // without_url keeps the API key out of error messages
        let resp = self.client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                RefreshError::Remote("request timed out".into())
            } else {
                RefreshError::Remote(e.without_url().to_string())
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RefreshError::Remote(format!("HTTP {}", status)));
        }
        let body = resp
            .text()
            .map_err(|e| RefreshError::Remote(e.without_url().to_string()))?;
        parse_payload(&body, Local::now().date_naive())
    }
}
