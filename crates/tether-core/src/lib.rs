//! # tether-core
//!
//! Transactional side-effect coordination for ORM-style sessions.
//!
//! The engine keeps externally-stored file content and a derived cache
//! consistent with the outcome of a database transaction:
//!
//! - **Inspector** (`inspect`): pure diffing of one file-valued attribute
//!   against its last committed baseline, producing a `ChangeDescriptor`
//! - **Ledger** (`ledger`): per-transaction accumulator merging descriptors
//!   across repeated flushes, drained exactly once at transaction end
//! - **Coordinators** (`coordinator`): blocking and suspending variants that
//!   subscribe to before-flush / after-commit / after-rollback, plan ordered
//!   storage operations (uploads strictly before the deletes they supersede),
//!   and dispatch them after a durable commit
//! - **Cache invalidation** (`cache`): invalidates `(entity, primary key)`
//!   cache entries once per committed transaction
//! - **Registry** (`registry`): opt-in participation of entity types and
//!   their file attributes
//!
//! # Consistency model
//!
//! Uploads are deferred until after commit; nothing is written to the storage
//! backend for an uncommitted transaction, so rollback only discards
//! bookkeeping and staged temp content. Post-commit storage failures are
//! logged and never re-raised into the completed commit; this is the accepted
//! divergence window of not having two-phase commit across the database and
//! the store.

pub mod cache;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod inspect;
pub mod ledger;
pub mod plan;
pub mod registry;
pub mod session;

pub use cache::{CacheBackend, CacheInvalidationCoordinator};
pub use coordinator::{
    BlockingCoordinator, DirtyInstance, SlotChange, SuspendingCoordinator, TransactionContext,
};
pub use descriptor::{ChangeDescriptor, PendingOperation};
pub use error::{CoordinatorError, Result};
pub use inspect::inspect;
pub use ledger::{Ledger, LedgerState};
pub use plan::{plan_operations, SlotPlan};
pub use registry::CoordinationRegistry;
pub use session::{global, install_global, SessionCoordinators};
