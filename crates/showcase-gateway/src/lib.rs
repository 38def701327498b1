//! showcase-gateway: HTTP JSON API for the browser playground
//!
//! Serves the model catalog, per-session playground and chat operations, and
//! generated images over an Axum server.

pub mod auth;
pub mod blobs;
pub mod protocol;
pub mod server;
pub mod session;

pub use server::{GatewayServer, GatewayState};
