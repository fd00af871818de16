//! Maps the user-facing `algo` / `kts` strings onto kernel library enums.
//!
//! Matching is exact and case-sensitive. Unknown strings do not fail; they
//! fall back to `Auto` and `BlockBased` respectively.

use crate::backends::nnp::{ConvolutionAlgorithm, TransformStrategy};

impl ConvolutionAlgorithm {
    const AUTO_STR: &'static str = "AUTO";
    const WINOGRAD_STR: &'static str = "WINOGRAD";
    const FT16_STR: &'static str = "FT16";
    const FT8_STR: &'static str = "FT8";
}

impl From<&str> for ConvolutionAlgorithm {
    fn from(value: &str) -> ConvolutionAlgorithm {
        match value {
            Self::AUTO_STR => ConvolutionAlgorithm::Auto,
            Self::WINOGRAD_STR => ConvolutionAlgorithm::Wt8x8,
            Self::FT16_STR => ConvolutionAlgorithm::Ft16x16,
            Self::FT8_STR => ConvolutionAlgorithm::Ft8x8,
            s => {
                debug!("Unknown convolution algorithm `{}`, using AUTO", s);
                ConvolutionAlgorithm::Auto
            }
        }
    }
}

impl TransformStrategy {
    const BLOCK_STR: &'static str = "BLOCK";
    const TUPLE_STR: &'static str = "TUPLE";
}

impl From<&str> for TransformStrategy {
    fn from(value: &str) -> TransformStrategy {
        match value {
            Self::BLOCK_STR => TransformStrategy::BlockBased,
            Self::TUPLE_STR => TransformStrategy::TupleBased,
            s => {
                debug!("Unknown kernel transform strategy `{}`, using BLOCK", s);
                TransformStrategy::BlockBased
            }
        }
    }
}
