//! # hubbub-core
//!
//! Foundation types for the hubbub fan-out hub.
//!
//! This crate provides the shared vocabulary the server crates depend on:
//!
//! - **Branded IDs**: [`PeerId`] as a newtype for type safety (UUID v7)
//! - **Wire envelope**: [`Event`] with a type tag and opaque JSON payload
//! - **Errors**: [`HubError`] via `thiserror`

#![deny(unsafe_code)]

pub mod errors;
pub mod event;
pub mod ids;

pub use errors::HubError;
pub use event::{classify, Event, SendMessagePayload, EVENT_SEND_MESSAGE};
pub use ids::PeerId;
