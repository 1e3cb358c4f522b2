/*!
# Invoice Ledger

Invoice and service-agreement generator for a home-healthcare provider, built
around a spreadsheet that doubles as the transaction ledger.

## Overview

Staff load the client intake sheet, pick a client, set the billing quantity,
and the tool renders an invoice. Every generated document appends one row to
the ledger. Agreements for the assigned nurse, physiotherapist or attendant
are filed in their own sheets and indexed by a short document hash.

## Identifier allocation

- **Invoice numbers** are `LOC-YYMMDD-NNN`: office code (`PUN`, `MUM`, `KOP`),
  issue date, and a 3-digit sequence that restarts for every office and day.
  The next number is the highest sequence already in the ledger for that
  partition plus one.
- **UIDs** are a 4-digit counter over the whole ledger.
- **Active engagements**: a client (keyed by `ref-serial`) is active while
  the `Service Ended` cell of their latest row is blank. Issuing against an
  active client is blocked unless staff choose to overwrite or force a new
  engagement.

Allocation reads the ledger, computes, then appends. Nothing serializes two
concurrent issuers, so they can be handed the same number.

## Modules

- **normalize**: cleaning of spreadsheet-typed identifiers (`7.0` -> `7`)
- **identifier**: invoice number and UID allocation
- **conflict**: active-record lookup and service-ended checks
- **record**: the ledger row
- **sheet**: row-oriented sheet stores (memory, CSV file, TTL cache)
- **invoice**: issuing invoices and ending engagements
- **agreement**: filing, indexing and verifying service agreements
- **intake**: loading the client intake sheet (CSV, or a workbook's
  `Confirmed` sheet with feature `xlsx`)
- **billing**, **plans**, **dates**, **document**, **render**: what goes on
  the printed page
- **snapshot**: compressed ledger backups
- **config**: runtime settings
- **export** (feature `xlsx`): CSV/XLSX downloads
- **app** (feature `web`): the HTTP API

Feature `cli` builds the `ledger-cli` terminal client; `web` implies both
`cli` and `xlsx`.

## REST API Endpoints

- `GET /api/ledger`, `/api/ledger.csv`, `/api/ledger.xlsx` - ledger rows
- `GET /api/next-id?date=&location=` - preview the next invoice number
- `GET /api/uid` - preview the next UID
- `GET /api/clients` - intake clients split by engagement state, with the
  ledger's present/ended reference keys
- `GET /api/active/{ref}` - the client's active record
- `POST /api/invoice` - issue an invoice
- `POST /api/end-service/{ref}` - close an engagement
- `POST /api/agreement`, `GET /api/verify/{hash}` - agreements
- `GET /api/snapshot` - gzip/bincode ledger backup
*/

pub mod agreement;
pub mod billing;
pub mod config;
pub mod conflict;
pub mod dates;
pub mod document;
pub mod error;
pub mod identifier;
pub mod intake;
pub mod invoice;
pub mod normalize;
pub mod plans;
pub mod record;
pub mod render;
pub mod sheet;
pub mod snapshot;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "xlsx")]
pub mod export;

pub use conflict::{Resolution, find_active_record, is_service_ended};
pub use error::{LedgerError, Result};
pub use identifier::{next_identifier, next_uid};
pub use normalize::normalize_id;
pub use record::LedgerRecord;
