//! # tally-core: Pure Rules for Tally
//!
//! Everything here is deterministic and free of I/O: how a counter value
//! becomes a document code, how a line-item mutation moves stock, and the
//! domain types the database layer persists.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Document use cases (purchase, sale, salary)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  series   │  │   stock   │  │   types   │  │ validation│  │   │
//! │  │   │ SeriesCfg │  │ LineItem  │  │   Item    │  │   rules   │  │   │
//! │  │   │ format    │  │  Event    │  │ Purchase  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │     sequences, code allocator, retrying persister, ledger       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`series`] - Series configuration, code formatting and parsing
//! - [`stock`] - Line-item events and their effect on item quantity
//! - [`types`] - Items, documents and line items
//! - [`money`] - Integer money for document totals
//! - [`error`] - Domain error types
//! - [`validation`] - Input checks applied before anything is written
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::series::{format_code, Period, SeriesConfig};
//!
//! let config = SeriesConfig::purchase();
//! let period = Period::Year(2024);
//!
//! let code = format_code(&config, &period, 7).unwrap();
//! assert_eq!(code, "PU24000007");
//! ```

pub mod error;
pub mod money;
pub mod series;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use series::{ParsedCode, Period, SeriesConfig};
pub use stock::{DocumentKind, EventKind, LineItemEvent};
pub use types::*;

/// Largest quantity accepted on a single line item.
///
/// Guards against keying errors (1000 instead of 10) before stock moves.
pub const MAX_LINE_QUANTITY: i64 = 100_000;
