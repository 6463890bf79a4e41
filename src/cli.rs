// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    )
}

fn tx_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(
        Arg::new("amount")
            .long("amount")
            .short('a')
            .required(required)
            .help("Amount spent, e.g. 12.50"),
    )
    .arg(
        Arg::new("currency")
            .long("currency")
            .short('c')
            .help("ISO 4217 code (defaults to the base currency on add)"),
    )
    .arg(
        Arg::new("category")
            .long("category")
            .short('k')
            .required(required)
            .help("FOOD | TRAVEL | UTILITIES | OTHER"),
    )
    .arg(
        Arg::new("description")
            .long("desc")
            .short('d')
            .help("Free-text description"),
    )
    .arg(
        Arg::new("at")
            .long("at")
            .help("YYYY-MM-DD [HH:MM[:SS]], local time (defaults to now on add)"),
    )
}

pub fn build_cli() -> Command {
    Command::new("spendwise")
        .version(crate_version!())
        .about("Personal expense tracking with multi-currency reporting")
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("Path to the database file"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("tx")
                .about("Record and manage expenses")
                .subcommand(tx_fields(Command::new("add").about("Record an expense"), true))
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List expenses, newest first")
                        .arg(Arg::new("month").long("month").help("YYYY-MM"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                ))
                .subcommand(tx_fields(
                    Command::new("edit")
                        .about("Replace fields of an existing expense")
                        .arg(Arg::new("id").required(true)),
                    false,
                ))
                .subcommand(
                    Command::new("rm")
                        .about("Delete an expense")
                        .arg(Arg::new("id").required(true)),
                ),
        )
        .subcommand(
            Command::new("fx")
                .about("Exchange rates")
                .subcommand(
                    Command::new("set-base")
                        .about("Set the preferred base currency")
                        .arg(Arg::new("currency").required(true)),
                )
                .subcommand(
                    Command::new("refresh")
                        .about("Fetch latest rates for the base currency when stale")
                        .arg(Arg::new("base").long("base"))
                        .arg(Arg::new("api-key").long("api-key"))
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .action(ArgAction::SetTrue)
                                .help("Refresh even if cached rates are fresh"),
                        ),
                )
                .subcommand(Command::new("status").about("Staleness of each cached base"))
                .subcommand(json_flags(
                    Command::new("list").about("Show cached rates").arg(
                        Arg::new("limit")
                            .long("limit")
                            .default_value("50")
                            .value_parser(value_parser!(usize)),
                    ),
                ))
                .subcommand(
                    Command::new("convert")
                        .about("Convert an amount between two currencies")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true))
                        .arg(Arg::new("date").long("date").help("YYYY-MM-DD")),
                )
                .subcommand(
                    Command::new("prune")
                        .about("Drop cached rates older than N days")
                        .arg(
                            Arg::new("days")
                                .long("days")
                                .default_value("30")
                                .value_parser(value_parser!(i64)),
                        ),
                ),
        )
        .subcommand(
            Command::new("report").about("Spending analytics").subcommand(
                Command::new("month")
                    .about("Monthly totals, categories, weeks and days")
                    .arg(Arg::new("month").required(true).help("YYYY-MM"))
                    .arg(
                        Arg::new("currency")
                            .long("currency")
                            .help("Convert every expense into this currency first"),
                    )
                    .arg(
                        Arg::new("json")
                            .long("json")
                            .action(ArgAction::SetTrue),
                    ),
            ),
        )
        .subcommand(
            Command::new("config")
                .about("Read and write settings")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(Command::new("show")),
        )
        .subcommand(
            Command::new("export").about("Export data").subcommand(
                Command::new("transactions")
                    .arg(
                        Arg::new("format")
                            .long("format")
                            .default_value("csv")
                            .value_parser(["csv", "json"]),
                    )
                    .arg(Arg::new("out").long("out").required(true)),
            ),
        )
        .subcommand(Command::new("doctor").about("Check rate coverage and freshness"))
}
