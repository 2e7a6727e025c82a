//! Shared GATT vocabulary for the vitalink sensor stack.
//!
//! This crate defines the types that the rest of the workspace speaks in:
//! attribute identities and properties, connection and bond state, the
//! [`Transport`] contract a platform adapter must implement, and the
//! [`GattEvent`] enum it delivers back. Nothing here talks to hardware;
//! the platform adapter (CoreBluetooth, BlueZ, Android binder glue, a test
//! mock) owns the radio and the event loop.
//!
//! # Event model
//!
//! A connection is a single logical actor. The adapter guarantees exactly
//! one outstanding read, write, or descriptor write at a time and delivers
//! all events on one cooperative sequence per connection:
//!
//! - **Requests** (consumer → adapter): the [`Transport`] methods
//! - **Events** (adapter → consumer): [`GattEvent`] values
//!
//! Higher layers issue a request, wait for its completion event, and only
//! then issue the next one.

mod attributes;
mod events;
mod operation;
mod state;
mod transport;

pub mod mock;
pub mod uuids;

pub use attributes::*;
pub use events::*;
pub use operation::*;
pub use state::*;
pub use transport::*;
