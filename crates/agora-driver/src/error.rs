//! Driver error type.

use crate::config::ConfigError;

/// Anything that can stop the driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The seed world could not be built.
    #[error("world error: {0}")]
    World(#[from] agora_world::WorldError),

    /// A seed chain could not be constructed.
    #[error("chain error: {0}")]
    Chain(#[from] agora_chain::ChainError),

    /// The dispatch pass failed.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] agora_dispatch::DispatchError),

    /// A campaign operation failed.
    #[error("campaign error: {0}")]
    Campaign(#[from] agora_campaign::CampaignError),

    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] agora_store::StoreError),
}
