use std::sync::Arc;

use audiotracks_core::storage::MediaStorage;
use audiotracks_core::tags::{LoftyCodec, MetadataCodec};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: audiotracks_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// On-disk media layout rooted at `config.media.root`.
    pub storage: Arc<MediaStorage>,
    /// Embedded tag reader/writer.
    pub codec: Arc<dyn MetadataCodec>,
}

impl AppState {
    /// Build state with the default `lofty` codec and storage rooted at the
    /// configured media root.
    pub fn new(pool: audiotracks_db::DbPool, config: ServerConfig) -> Self {
        let storage = Arc::new(MediaStorage::new(config.media.root.clone()));
        Self {
            pool,
            config: Arc::new(config),
            storage,
            codec: Arc::new(LoftyCodec::default()),
        }
    }
}
