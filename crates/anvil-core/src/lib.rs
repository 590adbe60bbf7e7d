//! anvil-core: Shared types and utilities for SoundAnvil
//!
//! This crate provides the foundational types used across all SoundAnvil
//! crates: the `Sample` type, stereo and mid/side sample pairs, and the
//! dB/linear conversions every processor and meter relies on.

mod sample;

pub use sample::*;
