use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use ashlar_engine::blockdb::BlockDb;
use ashlar_engine::world::World;
use ashlar_engine::world::chunk::{Chunk, SECTION_SIZE};
use ashlar_engine::world::position::{ChunkPos, LocalBlockPos};
use ashlar_server::block;
use ashlar_server::commands;
use ashlar_server::config::ServerConfig;
use ashlar_server::event_bus::{self, Broadcast};
use ashlar_server::net::{self, ServerCtx};
use ashlar_server::player_registry::PlayerRegistry;
use ashlar_server::ticker::{self, TickBudget};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path: Option<PathBuf> = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1)
        .map(Into::into);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    tracing::info!("Ashlar build server");

    let mut config = ServerConfig::load(config_path.as_deref())?;
    if let Some(bind) = std::env::args().skip_while(|a| a != "--bind").nth(1) {
        config.bind_addr = bind;
    }
    if let Some(world) = std::env::args().skip_while(|a| a != "--world").nth(1) {
        config.world_name = world;
    }
    let config = Arc::new(config);

    // ── World bootstrap ──────────────────────────────────────────────────
    let world = Arc::new(World::new());
    tracing::info!(name = %config.world_name, "Generating flat world...");
    generate_flat_world(&world, config.world_radius_chunks);
    tracing::info!("World ready: {} chunks", world.chunk_count());

    let db = Arc::new(BlockDb::new(
        config.world_name.clone(),
        config.blockdb_enabled,
        config.world_blockdb_enabled,
    ));
    if !db.is_enabled() {
        tracing::warn!("BlockDB is disabled; drawing works, bulk undo will not");
    }

    // Chat, join/leave, and completion reports all flow through one bus.
    let (bus_tx, _) = broadcast::channel::<Broadcast>(event_bus::BUS_CAPACITY);

    let ticker = ticker::start(
        Arc::clone(&world),
        Arc::clone(&db),
        bus_tx.clone(),
        TickBudget::from_config(&config),
    );

    let ctx = ServerCtx {
        world,
        db,
        registry: Arc::new(PlayerRegistry::new()),
        commands: Arc::new(commands::registry()),
        protected: Arc::new(config.protected_bounds()),
        bus: bus_tx,
        ticker,
        config: Arc::clone(&config),
    };

    // ── Listener with graceful shutdown ──────────────────────────────────
    tokio::select! {
        result = net::listener::run(ctx, &config.bind_addr) => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down...");
        }
    }
    Ok(())
}

/// Bedrock floor at y=0, stone to y=3, dirt at y=4, grass on top.
fn generate_flat_world(world: &World, chunk_radius: i32) {
    for cx in -chunk_radius..chunk_radius {
        for cz in -chunk_radius..chunk_radius {
            let mut chunk = Chunk::new();
            for x in 0..SECTION_SIZE as u8 {
                for z in 0..SECTION_SIZE as u8 {
                    chunk.set_block(LocalBlockPos { x, y: 0, z }, block::BEDROCK);
                    for y in 1..=3 {
                        chunk.set_block(LocalBlockPos { x, y, z }, block::STONE);
                    }
                    chunk.set_block(LocalBlockPos { x, y: 4, z }, block::DIRT);
                    chunk.set_block(LocalBlockPos { x, y: 5, z }, block::GRASS);
                }
            }
            world.insert_chunk(ChunkPos::new(cx, cz), chunk);
        }
    }
}
