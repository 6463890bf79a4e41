// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::path::Path;

use spendwise::{cli, commands, db, log::init_logging};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    init_logging(matches.get_flag("verbose"));

    let conn = match matches.get_one::<String>("db") {
        Some(path) => db::open_at(Path::new(path))?,
        None => db::open_or_init()?,
    };

    let result = match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database ready at {}", conn.path().unwrap_or("(memory)"));
            Ok(())
        }
        Some(("tx", sub)) => commands::transactions::handle(&conn, sub),
        Some(("fx", sub)) => commands::fx::handle(&conn, sub),
        Some(("report", sub)) => commands::reports::handle(&conn, sub),
        Some(("config", sub)) => commands::config::handle(&conn, sub),
        Some(("export", sub)) => commands::exporter::handle(&conn, sub),
        Some(("doctor", _)) => commands::doctor::handle(&conn),
        _ => {
            cli::build_cli().print_help()?;
            println!();
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
