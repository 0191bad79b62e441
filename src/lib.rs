//! Adaptive L7 field-level policy engine for service meshes.
//!
//! The engine stores per-service allow/suppress decisions over hierarchical
//! dotted field paths (`user.profile.email`), evolves those decisions in
//! response to observed traffic, and serves lookups to the data plane as
//! immutable O(1) snapshots.
//!
//! Four cooperating subsystems make up the core:
//!
//! - [`policy`] — the hierarchical path store (a trie with allow and
//!   suppress flags), the flat-snapshot compiler, and the wire codecs.
//! - [`adaptive`] — the schema-evolution governor that whitelists new paths
//!   only after a grace period of stable, repeated appearance.
//! - [`agent`] — a tabular Q-learning agent that picks allow / suppress /
//!   observe actions from discretized traffic features.
//! - [`coordinator`] — the single-writer engine that ties the three
//!   together and publishes snapshots atomically.
//!
//! The [`api`] module exposes the controller's HTTP surface on top of the
//! coordinator; the `fieldgate` binary wires it to an axum server.

pub mod adaptive;
pub mod agent;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod event;
pub mod policy;

pub use config::EngineConfig;
pub use coordinator::{Coordinator, Decision, DetectOutcome};
pub use event::{Event, Features, TrafficLabel};
pub use policy::{Access, FlatSnapshot, PolicyError, PolicyStore};
