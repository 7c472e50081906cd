//! Server shell around `ashlar-engine`: networking, sessions, commands, the
//! tick loop that drives draw operations, and the bulk-undo confirmation flow.

pub mod block;
pub mod bulk_undo;
pub mod commands;
pub mod config;
pub mod event_bus;
pub mod net;
pub mod permissions;
pub mod player_registry;
pub mod session;
pub mod ticker;
