//! Common types used throughout the wizard engine.
//!
//! This crate provides the shared type definitions for the guided journey
//! wizard: journey identifiers, the serializable journey context, wizard
//! events, persisted snapshots with validation, catalog data, and the
//! central backend failure classification. All types here are plain data;
//! behaviour lives in the machine, controller and adapter crates.

/// Catalog data returned by the backend: locations, menu items, plans,
/// ticketed events and their quantity bounds.
pub mod catalog;
/// Contact details, OTP channel selection and authentication progress.
pub mod contact;
/// The serializable per-journey context carried through every state.
pub mod context;
/// Events accepted by the wizard state machines.
pub mod events;
/// Central classification of backend failures.
pub mod failure;
/// Typed flow notifications: settled transitions and observer events.
pub mod flow;
/// Async operation descriptors, request and result payloads.
pub mod invoke;
/// Journey identifiers.
pub mod journey;
/// Persisted snapshots, schema versioning and validation.
pub mod snapshot;
/// Dotted state path identifiers.
pub mod state;

pub use catalog::*;
pub use contact::*;
pub use context::*;
pub use events::*;
pub use failure::*;
pub use flow::*;
pub use invoke::*;
pub use journey::*;
pub use snapshot::*;
pub use state::*;
