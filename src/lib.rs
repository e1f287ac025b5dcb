/*!
# Community Ethanol Dashboard

A multi-user web dashboard for recording how much ethanol is produced from
different kinds of waste, and for watching community progress.

## Overview

Users sign up, log in, and submit records of the form "N kg of some waste
category". Each record's ethanol yield is derived from a fixed conversion
table (litres per kg). The dashboard shows community totals, ethanol per
waste type, a contributor leaderboard, a data table of every record, and a
personal summary in the sidebar.

## Architecture

### Core
- **conversion**: the closed table of waste categories and yield factors
- **record**: yield computation, the typed `Record`, and validation of stored documents
- **aggregate**: totals, per-user and per-category sums, recomputed on every read

### Collaborators
- **store**: `RecordStore` trait, JSON-file and in-memory implementations
- **login**: `AuthProvider` trait, Argon2-hashed local accounts
- **session**: explicit session contexts owned by the server state
- **saving**: gzip + bincode backups of the whole store

### Presentation (feature `web`)
- **dashboard**: one handler per user interaction
- **app**: axum routes and cookie sessions
- **graph**: PNG bar charts via plotters
- **downloader**: CSV and XLSX export of the data table

## Data Flow

Every page load fetches a fresh record snapshot, aggregates it, and renders
it. Nothing is cached between requests. A submission computes the yield,
appends a record to the store, and the next read picks it up.

## REST API Endpoints

- `GET /api/categories` - Waste categories and their factors
- `POST /api/signup`, `POST /api/login`, `POST /api/logout` - Account forms
- `GET /api/me` - Logged-in identity and personal totals
- `POST /api/records` - Submit `{category, quantity}`
- `GET /api/community` - Totals, groupings and the data table
- `GET /charts/categories.png`, `GET /charts/users.png` - Bar charts
- `GET /export/records.csv`, `GET /export/records.xlsx` - Data table export
- `GET /api/backup`, `POST /api/restore` - Store backups
*/

pub mod aggregate;
pub mod config;
pub mod conversion;
pub mod downloader;
pub mod error;
pub mod record;
pub mod saving;
pub mod store;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod dashboard;
#[cfg(feature = "web")]
pub mod graph;
#[cfg(feature = "web")]
pub mod login;
#[cfg(feature = "web")]
pub mod session;

pub use aggregate::*;
pub use conversion::*;
pub use error::{DashboardError, Result};
pub use record::*;
pub use store::*;
