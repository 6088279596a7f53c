//! Configuration snapshots for one schema version.
//!
//! A snapshot is the portable form of a version's settings, per-user
//! metadata and install metadata. It can be captured from the host store,
//! written to disk, read back, and applied to the host store again.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.local/share/ccm/
//! ├── host.db          # SQLite host store (see `store::HostDb`)
//! ├── v1_data.json     # Last saved v1 snapshot
//! └── v2_data.json     # Last saved v2 snapshot
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ccm::snapshot::SnapshotStore;
//! use ccm::registry::{SchemaRegistry, SchemaVersion};
//!
//! let registry = SchemaRegistry::standard();
//! let mut snapshots = SnapshotStore::new(&mut db, &registry, 1);
//!
//! let snap = snapshots.capture(SchemaVersion::V1)?;
//! snapshots.persist(&snap, "v1_data.json".as_ref())?;
//!
//! let restored = snapshots.load(SchemaVersion::V1, "v1_data.json".as_ref())?;
//! snapshots.apply(&restored)?;
//! ```

mod file;
mod schema;
mod store;

pub use file::{atomic_write, read_artifact};
pub use schema::{Snapshot, is_empty_value};
pub use store::{ApplyReport, SnapshotStore};
