//! The two dashboard pages, as pure functions over a snapshot.
//!
//! Both return structured results for the presentation layer to render; a
//! page never prints or keeps state of its own.

use crate::aggregate::{
    ItemSummary, aggregate_daily, available_months, available_years, rows_in_month, rows_on,
    summarize_item,
};
use crate::error::{Error, Result};
use crate::inventory::{COL_ADDRESS, DailyAggregate, InventoryRow, Snapshot};
use crate::resolver::{Resolution, parse_item_code, resolve};
use chrono::NaiveDate;
use serde::Serialize;

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Portuguese month name for `1..=12`.
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get((month as usize).checked_sub(1)?).copied()
}

/// The day a lookup runs against.
#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
pub struct EffectiveDate {
    pub date: NaiveDate,
    /// True when there was no data for today and the picked date (or today) was used.
    pub today_missing: bool,
}

/// Today's data when there is any, otherwise the picked date (defaulting to today).
pub fn effective_date(
    snapshot: &Snapshot,
    today: NaiveDate,
    picked: Option<NaiveDate>,
) -> EffectiveDate {
    if snapshot.rows.iter().any(|r| r.saved_date == today) {
        EffectiveDate {
            date: today,
            today_missing: false,
        }
    } else {
        EffectiveDate {
            date: picked.unwrap_or(today),
            today_missing: true,
        }
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DailyView {
    /// No code typed: the whole day.
    DayTable {
        columns: Vec<String>,
        rows: Vec<InventoryRow>,
    },
    Item(ItemSummary),
    /// The code has no rows on this day.
    NoMatch { code: u64 },
    /// The day has no rows at all.
    NoData,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct DailyLookup {
    pub date: EffectiveDate,
    pub view: DailyView,
}

/// Daily lookup page.
///
/// # Errors
/// * `Error::Parse` when `code_text` is not a whole number
/// * `Error::Schema` when an item is looked up and the sheet has no `Endereço`
pub fn daily_lookup(
    snapshot: &Snapshot,
    today: NaiveDate,
    picked: Option<NaiveDate>,
    code_text: Option<&str>,
) -> Result<DailyLookup> {
    let date = effective_date(snapshot, today, picked);
    let day = rows_on(snapshot, date.date);

    let view = match code_text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => {
            let code = parse_item_code(text)?;
            if !snapshot.has_address() {
                return Err(Error::schema(COL_ADDRESS));
            }
            match summarize_item(&day.rows, code) {
                Some(summary) => DailyView::Item(summary),
                None => DailyView::NoMatch { code },
            }
        }
        None if day.is_empty() => DailyView::NoData,
        None => DailyView::DayTable {
            columns: day.columns,
            rows: day.rows,
        },
    };

    Ok(DailyLookup { date, view })
}

/// Inputs of the evolution page. Blank strings count as absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvolutionQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub code: Option<String>,
    pub search: Option<String>,
    /// A label picked from the candidate list.
    pub choice: Option<String>,
}

#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvolutionView {
    /// Nothing recorded for the selected month.
    NoData,
    /// The selected code has no rows in the month.
    ItemNotInMonth { code: u64 },
    Item {
        code: u64,
        description: String,
        series: Vec<DailyAggregate>,
    },
    Total { series: Vec<DailyAggregate> },
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Evolution {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub resolution: Resolution,
    pub view: EvolutionView,
}

impl Evolution {
    /// Chart heading for the current view.
    pub fn title(&self) -> String {
        match &self.view {
            EvolutionView::Item {
                code, description, ..
            } => format!("Evolução do Item: {} ({})", description, code),
            _ => match (self.month.and_then(month_name), self.year) {
                (Some(name), Some(year)) => format!("Estoque Total - {}/{}", name, year),
                _ => "Estoque Total".to_string(),
            },
        }
    }

    pub fn series(&self) -> &[DailyAggregate] {
        match &self.view {
            EvolutionView::Item { series, .. } | EvolutionView::Total { series } => {
                series.as_slice()
            }
            _ => &[],
        }
    }
}

/// Monthly evolution page.
///
/// Defaults to the newest year and its latest month with data. A direct code
/// beats the description search; with a search, `choice` picks the item.
///
/// # Errors
/// * `Error::Parse` for a month outside `1..=12` or an unparseable choice label
pub fn stock_evolution(snapshot: &Snapshot, query: &EvolutionQuery) -> Result<Evolution> {
    if let Some(month) = query.month {
        if month_name(month).is_none() {
            return Err(Error::Parse(format!("invalid month: {}", month)));
        }
    }

    let years = available_years(snapshot);
    let year = query.year.or_else(|| years.first().copied());
    let months = year
        .map(|y| available_months(snapshot, y))
        .unwrap_or_default();
    let month = query.month.or_else(|| months.last().copied());

    let monthly = match (year, month) {
        (Some(y), Some(m)) => rows_in_month(snapshot, y, m),
        _ => Snapshot::default(),
    };

    let blank_to_none = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());
    let code = blank_to_none(&query.code);
    let search = blank_to_none(&query.search);
    let choice = blank_to_none(&query.choice);

    if monthly.is_empty() {
        return Ok(Evolution {
            year,
            month,
            years,
            months,
            resolution: Resolution::Unfiltered,
            view: EvolutionView::NoData,
        });
    }

    let resolution = resolve(&monthly.rows, code.as_deref(), search.as_deref());
    let selected = match &resolution {
        Resolution::Code(c) => Some(*c),
        Resolution::Candidates(_) => match choice.as_deref() {
            Some(label) => resolution.select(label)?,
            None => None,
        },
        Resolution::NoMatch | Resolution::Unfiltered => None,
    };

    let view = match selected {
        Some(code) => {
            let series = aggregate_daily(&monthly.rows, Some(code));
            match monthly.rows.iter().find(|r| r.code == code) {
                Some(first) if !series.is_empty() => EvolutionView::Item {
                    code,
                    description: first.description.clone(),
                    series,
                },
                _ => EvolutionView::ItemNotInMonth { code },
            }
        }
        None => EvolutionView::Total {
            series: aggregate_daily(&monthly.rows, None),
        },
    };

    Ok(Evolution {
        year,
        month,
        years,
        months,
        resolution,
        view,
    })
}
