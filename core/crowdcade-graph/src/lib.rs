//! # crowdcade-graph
//!
//! Typed Graph API adapter for Crowdcade. Wraps the live video's reactions
//! and comments feeds behind [`crowdcade_core::SignalSource`] so the
//! controller never sees HTTP or wire JSON.

pub mod client;
pub mod types;

pub use client::GraphClient;
