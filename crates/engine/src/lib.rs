//! Core machinery of the Ashlar build server: the shared block grid, the
//! resumable draw-operation engine, the capacity-bounded undo log, and the
//! append-only BlockDB change log.
//!
//! This crate is runtime-free: no async, no I/O. The server crate drives
//! everything from a single tick context and hands lookups to worker threads.

pub mod blockdb;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod undo;
pub mod world;

/// Stable numeric identity of a player, allocated by the server's registry.
///
/// Survives reconnects within a server run, so BlockDB entries written by a
/// departed player can still be targeted by bulk undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);
