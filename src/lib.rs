/*!
# Spreadsheet Review Tool

Step through the rows of an Excel sheet one at a time, mark each row as
approved or not, and download the sheet again with the marks filled in.

## Overview

A user uploads an `.xlsx` or `.xls` file and picks a sheet. The tool makes
sure an `approved` column exists (adding one with `no` in every row if the
sheet lacks it), then shows one row at a time with navigation, a yes/no
choice, progress and summary counts. The reviewed sheet can be exported as
`updated_<original name>`.

## Architecture

### Core
- **Table** - Column names plus rows of text, number, boolean or empty cells
- **Session** - Working table, frozen original snapshot and cursor for one
  loaded file+sheet
- **Review controller** - Saturating navigation, approval writes and
  change accounting, all taking the session explicitly

### Codec
- **Loader** - Excel decoding via calamine, first row as header
- **Downloader** - XLSX encoding via rust_xlsxwriter

### Front ends
- **Web** - axum server with per-browser sessions (cookie), handlebars pages
- **CLI** - `review-cli`, a line-oriented terminal reviewer

## Modules

- **table**: Cell values, records and tables
- **session**: Session store and the approval marker
- **review**: Navigation, approval and summary operations
- **loader**: Spreadsheet decoding
- **downloader**: Spreadsheet encoding and export naming
- **config**: Server configuration and logging setup
- **view**: Page view models and templates
- **app**: Routing, handlers and middleware
- **error**: Error types

## Routes

- `/` - Upload form, or the review page once a file is loaded
- `/upload`, `/sheet` - Load a file, switch sheets
- `/navigate`, `/jump`, `/approval` - Review commands
- `/preview`, `/export`, `/api/state` - Full table, download, JSON snapshot
*/

pub mod app;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod review;
pub mod session;
pub mod table;
pub mod view;

/// Re-export the types most callers need
pub use error::{DecodeError, ReviewError};
pub use review::{Command, Navigation, Outcome, Summary};
pub use session::{APPROVAL_COLUMN, Approval, Session};
pub use table::{CellValue, Record, Table};
