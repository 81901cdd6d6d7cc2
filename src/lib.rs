/*!
# WMS Inventory Lookup

Read-only lookup and trend views over a warehouse management (WMS) stock
snapshot spreadsheet, behind a simple username/password login.

## Overview

Each day the warehouse system appends one row per stocked item to a sheet
(`WMS` inside an `.xlsm` workbook, or an equivalent CSV). This crate loads that
sheet, normalizes it into typed rows and answers two questions:

- **Daily lookup**: what was in stock on a given day, optionally for one item
  code, with its total quantity and storage addresses.
- **Stock evolution**: how the total stock (or one item's stock) moved day by
  day across a chosen month.

## Architecture

### Data Layer
- **loader**: reads CSV or any calamine-supported workbook into a `RawTable`
- **cache**: keeps the last table per file, keyed by modification time
- **preprocess**: normalization (column pruning, type coercion, date derivation)

### Query Layer
- **resolver**: turns a typed code, a free-text search or a picked candidate
  label into an item code
- **aggregate**: daily totals, month/year filters, item summaries
- **pages**: the two page computations, pure over a snapshot

### Presentation Layer
- **login**: SHA-256 credential store and the per-client `Session`
- **downloader**: CSV and XLSX export of the shown table or series
- **graph**: PNG line chart of a daily series
- **app**: axum routes, cookie sessions and error-to-status mapping

## REST API Endpoints

- `POST /login`, `POST /logout` - Session management
- `GET /api/session` - Current user and page
- `GET /api/consulta?date=&code=` - Daily lookup
- `GET /api/consulta/export.csv`, `/api/consulta/export.xlsx` - Daily table download
- `GET /api/evolucao?year=&month=&code=&search=&choice=` - Stock evolution
- `GET /api/evolucao/chart.png` - Stock evolution chart
*/

pub mod aggregate;
#[cfg(feature = "web")]
pub mod app;
pub mod cache;
pub mod cell;
pub mod config;
pub mod downloader;
pub mod error;
#[cfg(feature = "web")]
pub mod graph;
pub mod inventory;
pub mod loader;
pub mod login;
pub mod pages;
pub mod preprocess;
pub mod resolver;

pub use cache::SnapshotCache;
pub use cell::CellValue;
pub use config::Config;
pub use error::{Error, Result};
pub use inventory::{DailyAggregate, InventoryRow, RawTable, Snapshot};
pub use loader::{FreshnessToken, freshness_token, load_table};
pub use login::{CredentialStore, Page, Session};
pub use pages::{
    DailyLookup, DailyView, Evolution, EvolutionQuery, EvolutionView, daily_lookup,
    stock_evolution,
};
pub use preprocess::normalize;
pub use resolver::{Candidate, Resolution, resolve};
