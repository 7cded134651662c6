//! Application state shared by all handlers.

use std::sync::Arc;

use vitrine_core::Config;
use vitrine_processing::ImageNormalizer;
use vitrine_storage::ChunkAssembler;

pub struct AppState {
    pub config: Config,
    pub assembler: ChunkAssembler,
    pub normalizer: ImageNormalizer,
}

impl AppState {
    /// Build state from configuration. Finalized chunk uploads land in the tmp media
    /// directory; the image engine is selected here, once.
    pub fn new(config: Config) -> Arc<Self> {
        let assembler = ChunkAssembler::new(config.staging_dir.clone(), config.tmp_media_dir());
        let normalizer = ImageNormalizer::from_config(&config);

        Arc::new(Self {
            config,
            assembler,
            normalizer,
        })
    }
}
