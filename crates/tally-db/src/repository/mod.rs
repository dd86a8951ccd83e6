//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Repositories                                     │
//! │                                                                         │
//! │  SequenceRepository   code_sequences   reserve_next, current           │
//! │  ItemRepository       item             create, get, list, details      │
//! │  PurchaseRepository   purchase(+item)  create, update_lines, delete    │
//! │  SaleRepository       sale(+item)      create, update_lines, delete    │
//! │  SalaryRepository     salary           create, get                     │
//! │                                                                         │
//! │  Document repositories save through the RetryingPersister and move     │
//! │  stock through the InventoryLedger inside their own transaction.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod item;
pub mod purchase;
pub mod salary;
pub mod sale;
pub mod sequence;

mod lines;
