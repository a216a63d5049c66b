//! Error taxonomy.
//!
//! Nothing in this subsystem is fatal or user-visible: registration failures
//! degrade to a still-rendered but non-synchronized gallery, malformed
//! configuration falls back to defaults. These types exist so the silent
//! paths stay diagnosable.

use thiserror::Error;

/// Why a host could not be registered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    /// No slide container resolvable within the host, or the host carries no
    /// group marker. No instance is created.
    #[error("host has no resolvable slide container or group marker")]
    UnusableHost,

    /// The viewport-engine collaborator is not available yet. Discovery is
    /// retried on a bounded fixed-interval poll.
    #[error("viewport engine collaborator is not available")]
    MissingCollaborator,
}

/// A per-instance configuration blob failed to parse. Callers fall back to
/// [`CarouselConfig::default`](crate::config::CarouselConfig::default).
#[derive(Debug, Error)]
#[error("configuration blob is not valid JSON: {0}")]
pub struct ConfigError(#[from] serde_json::Error);
