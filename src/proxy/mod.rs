//! Link-rewriting reverse proxy
//!
//! Serves one upstream origin at a time, rewriting HTML responses so that
//! navigation stays inside the proxy.

pub mod server;
pub mod state;
pub mod transformer;

pub use server::{create_router, run_proxy, serve};
pub use state::{ProxyContext, ProxyError};
pub use transformer::{BodyHandling, ProxyContentTransformer};
