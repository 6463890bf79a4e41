// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Food,
    Travel,
    Utilities,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Food,
        Category::Travel,
        Category::Utilities,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "FOOD",
            Category::Travel => "TRAVEL",
            Category::Utilities => "UTILITIES",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .with_context(|| {
                format!("Unknown category '{}', expected FOOD|TRAVEL|UTILITIES|OTHER", s)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: Category,
    pub description: String,
    pub timestamp: NaiveDateTime,
}

/// One observed exchange rate: 1 `base_currency` = `rate` `target_currency`.
///
/// `last_fetched_at` is kept as the raw stored text so that a corrupt value
/// can be detected (and treated as stale) instead of failing the read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRate {
    pub base_currency: String,
    pub target_currency: String,
    pub rate: f64,
    pub date: NaiveDate,
    pub last_fetched_at: String,
}

/// What a remote rate source hands back for a single base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RatePayload {
    pub base_currency: String,
    pub as_of: NaiveDate,
    pub rates: HashMap<String, f64>,
}

/// A calendar month, `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    /// Number of calendar days in the month.
    pub fn days(&self) -> u32 {
        self.last_day().day()
    }

    /// Number of Monday-start weeks that overlap the month.
    pub fn weeks_overlapping(&self) -> u32 {
        let offset = self.first_day().weekday().num_days_from_monday();
        (self.days() + offset).div_ceil(7)
    }

    /// 1-based Monday-start week ordinal; week 1 contains the 1st.
    pub fn week_of_month(&self, date: NaiveDate) -> u32 {
        let offset = self.first_day().weekday().num_days_from_monday();
        (date.day() - 1 + offset) / 7 + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let d = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
        Ok(Month::of(d))
    }
}

impl Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: Decimal,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    pub week_of_month: u32,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub total: Decimal,
    pub category_totals: BTreeMap<Category, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub month: Month,
    pub total_expenses: Decimal,
    pub transaction_count: usize,
    pub average_daily: Decimal,
    pub average_weekly: Decimal,
    pub categories: Vec<CategoryTotal>,
    pub weekly: Vec<WeeklyAggregate>,
    pub daily: Vec<DailyAggregate>,
}
