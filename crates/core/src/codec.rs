// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable payload encoding
//!
//! The pipeline never interprets payload bytes itself. Format-specific
//! failures are reported as "no payload" rather than propagated.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Turns a value into bytes
pub trait Encoder<T>: Send + Sync {
    fn encode(&self, value: &T) -> Option<Vec<u8>>;
}

/// Turns bytes back into a value
pub trait Decoder<T>: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Option<T>;
}

/// Both directions of one wire format
pub trait Codec<T>: Encoder<T> + Decoder<T> {}

impl<T, C: Encoder<T> + Decoder<T>> Codec<T> for C {}

/// JSON encoding backed by serde
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec<T> {
    fn encode(&self, value: &T) -> Option<Vec<u8>> {
        match serde_json::to_vec(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(error = %e, "json encode failed");
                None
            }
        }
    }
}

impl<T: DeserializeOwned> Decoder<T> for JsonCodec<T> {
    fn decode(&self, bytes: &[u8]) -> Option<T> {
        match serde_json::from_slice(bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, len = bytes.len(), "json decode failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
