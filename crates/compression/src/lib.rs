#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

/// Re-export commonly used types and functions.
pub mod prelude {
    pub use crate::{
        config::{CompressionAlgo, CompressorConfig, CompressorKind},
        decompress::decompress_channel,
        errors::{CompressorError, DecompressionError},
        Compressor,
    };
}

mod config;
pub use config::{
    CompressionAlgo, CompressorConfig, CompressorKind, CHANNEL_VERSION_BROTLI, CLOSE_OVERHEAD_ZLIB,
    SAFE_COMPRESSION_OVERHEAD,
};

mod errors;
pub use errors::{CompressorError, DecompressionError};

mod stream;

mod ratio;
pub use ratio::RatioCompressor;

mod shadow;
pub use shadow::ShadowCompressor;

mod none;
pub use none::NonCompressor;

mod compressor;
pub use compressor::Compressor;

mod decompress;
pub use decompress::{
    decompress_channel, ZLIB_DEFLATE_COMPRESSION_METHOD, ZLIB_RESERVED_COMPRESSION_METHOD,
};
