//! Media Host Adapters - Screenshot Storage
//!
//! Upload signatures for the browser and signed deletion for orphaned
//! screenshots. Without credentials the service still runs: signatures
//! are refused and deletions are reported as not configured.

pub mod client;
pub mod signer;

use std::sync::Arc;

use anyhow::Result;

pub use client::{MediaHostClient, UnconfiguredHost};
pub use signer::{MediaSigner, UploadSignature};

use crate::config::MediaConfig;
use crate::ports::asset_host::AssetHost;

/// Build the signer and asset host for `config`.
pub fn build_media(config: &MediaConfig) -> Result<(Option<MediaSigner>, Arc<dyn AssetHost>)> {
    match config.credentials() {
        Some(credentials) => {
            let host: Arc<dyn AssetHost> =
                Arc::new(MediaHostClient::new(credentials.clone(), config)?);
            Ok((Some(MediaSigner::new(credentials)), host))
        }
        None => {
            let host: Arc<dyn AssetHost> = Arc::new(UnconfiguredHost);
            Ok((None, host))
        }
    }
}
