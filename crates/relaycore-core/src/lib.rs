//! Core types shared by every relaycore crate: component identity and
//! version records, the cross-surface message envelope, single-instance
//! state records, wire shapes for the updater's filesystem RPC and the
//! GitHub releases feed, and the common error kind.
//!
//! This crate has no dependency on any other `relaycore-*` crate; every
//! other crate in the workspace depends on it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod component;
pub mod envelope;
pub mod error;
pub mod semver;
pub mod state;
pub mod wire;

pub use component::{ComponentHealth, ComponentKey, ComponentType, ComponentVersion, DEFAULT_TTL};
pub use envelope::{Envelope, EnvelopeBuilder};
pub use error::{Level, SupervisorError, SupervisorResult};
pub use semver::Semver;
pub use state::{CloudPhase, ConnectivityState, NtpState};
pub use wire::{GithubRelease, GithubReleaseAsset, UpdateRequest, UpdateStatus};
