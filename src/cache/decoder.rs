//! # Precompiled Decoder Module
//!
//! Decoding of precompiled geometry shipped with voxel objects.
//!
//! ## Payload format
//!
//! ```text
//! base64(lz4_block(u32 LE uncompressed length ++ CompiledGeometry JSON))
//! ```
//!
//! The length prefix is the one written by `lz4_flex::compress_prepend_size`.

use base64::{engine::general_purpose::STANDARD, Engine};
use futures::future::{self, BoxFuture, FutureExt};
use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use crate::{
    error::{LoaderError, LoaderResult},
    meshing::CompiledGeometry,
};

/// Turns an opaque precompiled payload into compiled geometry.
///
/// Implementations may suspend (for example to decompress off-thread). The
/// result is trusted apart from the basic shape checks the caller runs.
pub trait PrecompiledDecoder: Send + Sync {
    fn decode<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, LoaderResult<CompiledGeometry>>;
}

/// Decoder for the base64 / LZ4 / JSON payload format.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lz4PayloadDecoder;

impl Lz4PayloadDecoder {
    pub fn decode_now(payload: &str) -> LoaderResult<CompiledGeometry> {
        let compressed = STANDARD
            .decode(payload.trim())
            .map_err(|e| LoaderError::DecodeFailure(format!("payload is not base64: {e}")))?;

        let json = decompress_size_prepended(&compressed)
            .map_err(|e| LoaderError::DecodeFailure(format!("lz4 block is corrupt: {e}")))?;

        serde_json::from_slice(&json)
            .map_err(|e| LoaderError::DecodeFailure(format!("geometry json is invalid: {e}")))
    }
}

impl PrecompiledDecoder for Lz4PayloadDecoder {
    fn decode<'a>(&'a self, payload: &'a str) -> BoxFuture<'a, LoaderResult<CompiledGeometry>> {
        future::ready(Self::decode_now(payload)).boxed()
    }
}

/// Produces a payload that [`Lz4PayloadDecoder`] reads back.
pub fn encode_precompiled(geometry: &CompiledGeometry) -> LoaderResult<String> {
    let json = serde_json::to_vec(geometry)
        .map_err(|e| LoaderError::DecodeFailure(format!("geometry is not serializable: {e}")))?;
    Ok(STANDARD.encode(compress_prepend_size(&json)))
}
