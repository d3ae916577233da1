//! # Loader Error Types
//!
//! All errors that can surface from compiling, decoding or caching a voxel object.

use thiserror::Error;

/// Errors that can occur while turning a voxel object into a mesh.
///
/// The type is `Clone` so a single failed build can be delivered to every
/// caller that was waiting on the same cache key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// The voxel object could not be parsed or has an invalid shape.
    #[error("malformed voxel object: {0}")]
    MalformedObject(String),

    /// A precompiled payload could not be decoded into geometry.
    #[error("failed to decode precompiled geometry: {0}")]
    DecodeFailure(String),

    /// No cached entry and no object source could satisfy the request.
    #[error("no voxel object available for `{0}`")]
    LookupMiss(String),

    /// The request options are out of range.
    #[error("invalid request options: {0}")]
    InvalidOptions(String),

    /// The build that owned a pending cache entry was dropped before finishing.
    #[error("pending build was abandoned before completion")]
    BuildAbandoned,

    /// The shared ramp texture could not be encoded.
    #[error("failed to encode ramp texture: {0}")]
    RampEncoding(String),

    /// The loader configuration could not be read.
    #[error("invalid loader configuration: {0}")]
    Config(String),
}

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
