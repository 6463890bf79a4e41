// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store::SettingsProvider;
use crate::utils::{get_setting, parse_currency, pretty_table, required, set_setting};
use anyhow::{Result, bail};
use rusqlite::Connection;

pub const KEYS: [&str; 3] = ["base_currency", "fx_api_key", "fx_api_url"];

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = required(sub, "key")?;
            let value = required(sub, "value")?;
            set(conn, key, value)?;
            println!("{} updated", key);
        }
        Some(("get", sub)) => {
            let key = required(sub, "key")?;
            println!("{}", effective(conn, key)?);
        }
        Some(("show", _)) => {
            let mut rows = Vec::new();
            for key in KEYS {
                let value = effective(conn, key)?;
                let shown = if key == "fx_api_key" { mask(&value) } else { value };
                rows.push(vec![key.to_string(), shown]);
            }
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        _ => {}
    }
    Ok(())
}

/// Validates and stores a known setting.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let value = match key {
        "base_currency" => parse_currency(value)?,
        "fx_api_url" => {
            let v = value.trim().trim_end_matches('/');
            if !(v.starts_with("https://") || v.starts_with("http://")) {
                bail!("fx_api_url must be an http(s) URL");
            }
            v.to_string()
        }
        "fx_api_key" => value.trim().to_string(),
        other => bail!("Unknown setting '{}', expected one of {}", other, KEYS.join(", ")),
    };
    set_setting(conn, key, &value)
}

/// The stored value, or its default when unset.
pub fn effective(conn: &Connection, key: &str) -> Result<String> {
    Ok(match key {
        "base_currency" => conn.base_currency()?,
        "fx_api_key" => conn.fx_api_key()?,
        "fx_api_url" => conn.fx_api_url()?,
        other => get_setting(conn, other)?.unwrap_or_default(),
    })
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "(unset)".into(),
        n if n <= 4 => "****".into(),
        n => format!("****{}", chars[n - 4..].iter().collect::<String>()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DEFAULT_BASE_CURRENCY, DEFAULT_FX_API_URL};

    #[test]
    fn defaults_and_validation() {
        let mut conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&mut conn).unwrap();
        assert_eq!(effective(&conn, "base_currency").unwrap(), DEFAULT_BASE_CURRENCY);
        assert_eq!(effective(&conn, "fx_api_url").unwrap(), DEFAULT_FX_API_URL);

        set(&conn, "base_currency", "eur").unwrap();
        assert_eq!(effective(&conn, "base_currency").unwrap(), "EUR");
        assert!(set(&conn, "base_currency", "euro").is_err());
        assert!(set(&conn, "fx_api_url", "ftp://x").is_err());
        assert!(set(&conn, "colour", "blue").is_err());
    }

    #[test]
    fn api_key_is_masked() {
        assert_eq!(mask(""), "(unset)");
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("abcdef123456"), "****3456");
    }
}
