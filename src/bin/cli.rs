#![cfg(not(tarpaulin_include))]

use chrono::{Local, NaiveDate};
use std::env;
use std::process::ExitCode;
use wms_lookup::downloader::series_to_csv;
use wms_lookup::{
    Config, CredentialStore, EvolutionQuery, Snapshot, daily_lookup, load_table, normalize,
    stock_evolution,
};

const USAGE: &str = "\
Usage:
  wms-cli day [DATE] [CODE]
  wms-cli month [YEAR MONTH] [--code C] [--search T] [--choice LABEL] [--csv]
  wms-cli add-user USER PASS";

fn load_snapshot(config: &Config) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let table = load_table(&config.data_file, &config.sheet_name)?;
    Ok(normalize(&table)?)
}

fn day(config: &Config, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    // A lone argument is a date if it reads as one, otherwise a code.
    let (picked, code) = match args {
        [] => (None, None),
        [one] => match NaiveDate::parse_from_str(one, "%Y-%m-%d") {
            Ok(date) => (Some(date), None),
            Err(_) => (None, Some(one.as_str())),
        },
        [date, code, ..] => (
            Some(NaiveDate::parse_from_str(date, "%Y-%m-%d")?),
            Some(code.as_str()),
        ),
    };

    let snapshot = load_snapshot(config)?;
    let page = daily_lookup(&snapshot, Local::now().date_naive(), picked, code)?;
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

fn month(config: &Config, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut query = EvolutionQuery::default();
    let mut positional = Vec::new();
    let mut as_csv = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--code" => query.code = iter.next().cloned(),
            "--search" => query.search = iter.next().cloned(),
            "--choice" => query.choice = iter.next().cloned(),
            "--csv" => as_csv = true,
            other => positional.push(other),
        }
    }

    match positional.as_slice() {
        [] => {}
        [year, month] => {
            query.year = Some(year.parse()?);
            query.month = Some(month.parse()?);
        }
        _ => return Err(USAGE.into()),
    }

    let snapshot = load_snapshot(config)?;
    let evolution = stock_evolution(&snapshot, &query)?;
    if as_csv {
        print!("{}", series_to_csv(evolution.series()));
    } else {
        println!("{}", evolution.title());
        println!("{}", serde_json::to_string_pretty(&evolution)?);
    }
    Ok(())
}

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    match args.first().map(String::as_str) {
        Some("day") => day(&config, &args[1..]),
        Some("month") => month(&config, &args[1..]),
        Some("add-user") => match &args[1..] {
            [user, pass] => {
                let store = CredentialStore::new(&config.users_file);
                store.init()?;
                store.add_user(user, pass)?;
                println!("user '{}' saved to {}", user, store.path().display());
                Ok(())
            }
            _ => Err(USAGE.into()),
        },
        _ => Err(USAGE.into()),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
