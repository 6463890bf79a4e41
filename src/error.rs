// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Why a rate refresh did not update the cache.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("remote rate source failed: {0}")]
    Remote(String),
    #[error("rate cache write failed: {0:#}")]
    Cache(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("rate unavailable for {from} -> {to}")]
    RateUnavailable { from: String, to: String },
    #[error("converting {amount} {from} -> {to} overflows")]
    Overflow {
        amount: String,
        from: String,
        to: String,
    },
}
