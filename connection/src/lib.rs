//! Connection Manager (§4.5): the one-way KeyExchange-to-Session
//! transition, buffer-size bounds, and the server's pre-authentication
//! `Guest<N>` naming. `safecloud-handshake` and `safecloud-session` remain
//! pure state machines over a generic stream; this crate is the glue that
//! sequences them and owns the phase transition.

mod buffers;
mod client;
mod error;
mod guest;
mod pool_factory;
mod server;
mod state;

pub use buffers::MIN_BUFFER_LEN;
pub use client::ClientConnection;
pub use error::ConnectionError;
pub use guest::GuestNames;
pub use pool_factory::StoragePoolFactory;
pub use server::{ServerConnection, ServerConnectionOutcome};
pub use state::ConnectionState;
