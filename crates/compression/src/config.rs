//! Compressor configuration.

use core::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The safe upper bound, in bytes, on the overhead a compression stream adds to its output.
/// The shadow compressor starts its size estimate from this value.
pub const SAFE_COMPRESSION_OVERHEAD: u64 = 51;

/// The number of bytes closing a flushed zlib stream may add.
pub const CLOSE_OVERHEAD_ZLIB: u64 = 9;

/// The version byte prefixed to brotli-compressed channels.
pub const CHANNEL_VERSION_BROTLI: u8 = 0x01;

/// The strategy a compressor uses to decide that it is full.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressorKind {
    /// Full once the input reaches `target_output_size / approx_compr_ratio`.
    Ratio,
    /// Full once a flushed shadow stream plus the close overhead exceeds the target.
    #[default]
    Shadow,
    /// Stores the input uncompressed. Full once the output reaches the target.
    None,
}

impl fmt::Display for CompressorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ratio => write!(f, "ratio"),
            Self::Shadow => write!(f, "shadow"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for CompressorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ratio" => Ok(Self::Ratio),
            "shadow" => Ok(Self::Shadow),
            "none" => Ok(Self::None),
            _ => Err(format!("Invalid compressor kind: {s}")),
        }
    }
}

/// The compression algorithm of a channel.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionAlgo {
    /// Zlib at the best compression level.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "zlib"))]
    Zlib,
    /// Brotli at quality 9.
    #[cfg_attr(feature = "serde", serde(rename = "brotli-9"))]
    Brotli9,
    /// Brotli at quality 10.
    #[cfg_attr(feature = "serde", serde(rename = "brotli-10"))]
    Brotli10,
    /// Brotli at quality 11.
    #[cfg_attr(feature = "serde", serde(rename = "brotli-11"))]
    Brotli11,
}

impl CompressionAlgo {
    /// Returns `true` for the brotli variants.
    pub const fn is_brotli(&self) -> bool {
        !matches!(self, Self::Zlib)
    }

    /// Returns the brotli quality level, if this is a brotli variant.
    pub const fn brotli_quality(&self) -> Option<u32> {
        match self {
            Self::Zlib => None,
            Self::Brotli9 => Some(9),
            Self::Brotli10 => Some(10),
            Self::Brotli11 => Some(11),
        }
    }

    /// The number of bytes that closing a flushed stream of this algorithm may add.
    pub const fn close_overhead(&self) -> u64 {
        match self {
            Self::Zlib => CLOSE_OVERHEAD_ZLIB,
            _ => SAFE_COMPRESSION_OVERHEAD,
        }
    }
}

impl fmt::Display for CompressionAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zlib => write!(f, "zlib"),
            Self::Brotli9 => write!(f, "brotli-9"),
            Self::Brotli10 => write!(f, "brotli-10"),
            Self::Brotli11 => write!(f, "brotli-11"),
        }
    }
}

impl FromStr for CompressionAlgo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zlib" => Ok(Self::Zlib),
            "brotli" | "brotli-10" => Ok(Self::Brotli10),
            "brotli-9" => Ok(Self::Brotli9),
            "brotli-11" => Ok(Self::Brotli11),
            _ => Err(format!("Invalid compression algorithm: {s}")),
        }
    }
}

/// Configures a [Compressor](crate::Compressor).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorConfig {
    /// The output size, in bytes, the compressor tries not to exceed.
    pub target_output_size: u64,
    /// The expected compression ratio. Only used by [CompressorKind::Ratio].
    pub approx_compr_ratio: f64,
    /// The fullness strategy.
    pub kind: CompressorKind,
    /// The compression algorithm.
    pub algo: CompressionAlgo,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            target_output_size: 0,
            approx_compr_ratio: 0.6,
            kind: CompressorKind::default(),
            algo: CompressionAlgo::default(),
        }
    }
}

impl CompressorConfig {
    /// Returns a copy of the config with the given target output size.
    pub const fn with_target_output_size(mut self, target_output_size: u64) -> Self {
        self.target_output_size = target_output_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algo_from_str() {
        assert_eq!("zlib".parse::<CompressionAlgo>(), Ok(CompressionAlgo::Zlib));
        assert_eq!("brotli".parse::<CompressionAlgo>(), Ok(CompressionAlgo::Brotli10));
        assert_eq!("brotli-11".parse::<CompressionAlgo>(), Ok(CompressionAlgo::Brotli11));
        assert!("lz4".parse::<CompressionAlgo>().is_err());
        for algo in [
            CompressionAlgo::Zlib,
            CompressionAlgo::Brotli9,
            CompressionAlgo::Brotli10,
            CompressionAlgo::Brotli11,
        ] {
            assert_eq!(algo.to_string().parse::<CompressionAlgo>(), Ok(algo));
        }
    }

    #[test]
    fn test_close_overhead() {
        assert_eq!(CompressionAlgo::Zlib.close_overhead(), CLOSE_OVERHEAD_ZLIB);
        assert_eq!(CompressionAlgo::Brotli10.close_overhead(), SAFE_COMPRESSION_OVERHEAD);
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_deserialize_config() {
        let raw = r#"{
            "target_output_size": 1000,
            "approx_compr_ratio": 0.4,
            "kind": "ratio",
            "algo": "brotli-9"
        }"#;
        let config: CompressorConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.target_output_size, 1000);
        assert_eq!(config.kind, CompressorKind::Ratio);
        assert_eq!(config.algo, CompressionAlgo::Brotli9);
    }
}
