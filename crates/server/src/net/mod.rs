//! Line-oriented TCP front end. Deliberately thin: one line in, one command
//! or chat message; one line out per report.

pub mod connection;
pub mod listener;

use std::sync::Arc;

use tokio::sync::broadcast;

use ashlar_engine::blockdb::BlockDb;
use ashlar_engine::geometry::BoundingBox;
use ashlar_engine::world::World;

use crate::commands::CommandRegistry;
use crate::config::ServerConfig;
use crate::event_bus::Broadcast;
use crate::player_registry::PlayerRegistry;
use crate::ticker::TickerHandle;

/// Shared handles every connection task needs.
#[derive(Clone)]
pub struct ServerCtx {
    pub world: Arc<World>,
    pub db: Arc<BlockDb>,
    pub registry: Arc<PlayerRegistry>,
    pub commands: Arc<CommandRegistry>,
    pub config: Arc<ServerConfig>,
    pub protected: Arc<Vec<BoundingBox>>,
    pub bus: broadcast::Sender<Broadcast>,
    pub ticker: TickerHandle,
}
