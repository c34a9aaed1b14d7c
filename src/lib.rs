//! A lightweight SOCKS5 proxy library
//!
//! ## SOCKS5 Implementation
//!
//! - Features:
//!     - CONNECT (BIND and UDP ASSOCIATE are rejected)
//!     - No Authentication
//!     - Username/Password Authentication
//!     - Async using tokio, one task per client connection
//!     - Duplex relay with bounded retry on connection reset / broken pipe
//!     - Optional handshake and connect timeouts
//! - [SOCKS5 (RFC 1928)](https://datatracker.ietf.org/doc/html/rfc1928)
//! - [Username/Password Authentication (RFC 1929)](https://datatracker.ietf.org/doc/html/rfc1929)
//!
//! # Example
//! ```no_run
//! use socks5_proxy::{ProxyConfig, Socks5Server, UserPass};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProxyConfig::new("127.0.0.1", 1080)
//!         .with_auth(Some(UserPass::new("user", "pass")));
//!     Socks5Server::new(config).run().await
//! }
//! ```

pub mod address;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;

// Re-export main types at crate root for convenience
pub use address::{Address, TargetAddress};
pub use config::{ProxyConfig, RetryPolicy, UserPass};
pub use error::ProxyError;
pub use protocol::{AuthMethod, Command, ReplyCode, Version};
pub use server::{Session, Socks5Server};
