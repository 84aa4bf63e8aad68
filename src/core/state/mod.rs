// src/core/state/mod.rs

//! Defines the central `ServerState` struct and the registries it owns.

mod client;
mod core;
mod drain;
mod stats;

pub use client::{ClientInfo, ClientRegistry};
pub use core::ServerState;
pub use drain::DrainBarrier;
pub use stats::ServerStats;
