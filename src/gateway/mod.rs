//! HTTP surface of the proxy: routes, middleware layers and listeners.

pub mod server;
pub mod tls;

pub use server::{router, AppState, ProxyServer};
