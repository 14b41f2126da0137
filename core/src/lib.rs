//! Shared core for the Belay coaching backend: the cross-platform wire
//! format for heterogeneous workout records and the mutation protocol for
//! the per-user coordinator context. Everything here is pure and
//! synchronous — the HTTP surface, agent orchestration, and the hosted
//! memory collaborator live in `belay-api` and call into these types.

pub mod completed;
pub mod context;
pub mod dates;
pub mod error;
pub mod grades;
pub mod mutations;
pub mod plan;
pub mod sessions;
