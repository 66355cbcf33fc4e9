//! Filesystem and transport glue for the `server`/`client` binaries. Kept
//! as a library so the binaries stay thin `main.rs` wrappers and so this
//! glue is unit-testable without spawning a real process.

pub mod fs_pool;
pub mod fs_registry;

pub const DEFAULT_PORT: u16 = 53210;
