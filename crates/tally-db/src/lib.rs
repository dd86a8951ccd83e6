//! # tally-db: Database Layer for Tally
//!
//! SQLite storage for the inventory and bookkeeping system: per-series
//! counters, the code allocator, the retrying persister, the inventory
//! ledger and the repositories built on top of them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Data Flow                                │
//! │                                                                         │
//! │  db.purchases().create(new_purchase)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   RetryingPersister ──► CodeAllocator ──► SequenceRepository    │   │
//! │  │          │                 (PU24000007)     (atomic upsert)     │   │
//! │  │          ▼                                                      │   │
//! │  │   one transaction: document row + lines + InventoryLedger       │   │
//! │  │          │                                                      │   │
//! │  │          └── UNIQUE(purchase.code) hit? allocate again, retry   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`allocator`] - Formatted code allocation
//! - [`persister`] - Save-with-retry on code conflicts
//! - [`ledger`] - Stock maintenance from line-item events
//! - [`repository`] - Counters, items and documents
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//!
//! let purchase = db.purchases().create(new_purchase).await?;
//! println!("saved {}", purchase.code);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod persister;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use allocator::CodeAllocator;
pub use error::{DbError, DbResult};
pub use ledger::InventoryLedger;
pub use persister::{RetryingPersister, DEFAULT_MAX_ATTEMPTS};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::item::ItemRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::salary::SalaryRepository;
pub use repository::sale::SaleRepository;
pub use repository::sequence::SequenceRepository;
