// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! evl-core: shared data model for the evl event pipeline
//!
//! This crate provides:
//! - Source and event identity (`SourceIdentifier`, `EventIdentifier`, `EventWrapper`)
//! - The pluggable `Encoder`/`Decoder` collaborator and a JSON implementation
//! - The `SourceRegistry` collaborator notified on store creation and retirement
//! - `EventSequence`, the growable sequence abstraction read by live filters
//! - Concrete payload types for logging and access events

pub mod codec;
pub mod event;
pub mod payload;
pub mod registry;
pub mod sequence;
pub mod source;

pub use codec::{Codec, Decoder, Encoder, JsonCodec};
pub use event::{EventIdentifier, EventWrapper};
pub use payload::{AccessEvent, Level, LoggingEvent, ThrowableInfo};
pub use registry::{MemoryRegistry, SourceRegistry};
pub use sequence::{CircularBuffer, EventSequence, Unreadable};
pub use source::SourceIdentifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use registry::{FakeRegistry, RegistryCall};
