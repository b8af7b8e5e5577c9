//! Connection synchronization engine
//!
//! One independent worker task per enabled connection, owned by a supervisor.
//!
//! ```text
//!                  ┌─────────────────┐
//!                  │   Supervisor    │
//!                  └────────┬────────┘
//!                           │ spawns / stops per connection
//!              ┌────────────┼────────────┐
//!              │            │            │
//!      ┌───────▼───────┐    │    ┌───────▼───────┐
//!      │ SyncWorker-1  │    │    │ SyncWorker-N  │
//!      │ (adapter A)   │    │    │ (adapter B)   │
//!      └───────┬───────┘    │    └───────┬───────┘
//!              │  fetch → apply → publish │
//!              └────────────┬────────────┘
//!                           │
//!              ┌────────────▼────────────┐
//!              │ UpdateService │ Notifier│
//!              └─────────────────────────┘
//! ```
//!
//! Ticks for one connection never overlap themselves: a worker's fetch-apply-
//! publish step runs to completion inside its select loop before the next
//! tick is considered. Ticks for different connections are fully independent,
//! and no failure of one connection propagates to another.

pub mod messages;
pub mod supervisor;
pub mod worker;
