//! The API layer: request/response calls against the console's REST API.
//!
//! [`ApiLayer`] is the seam the sync core depends on; [`WmsClient`] is the
//! reqwest-backed implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wmsync_sdk::client::{ApiLayer, ClientConfig, WmsClient};
//! use wmsync_sdk::token::{MemoryTokenStore, Tokens};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tokens = Arc::new(MemoryTokenStore::with_tokens(Tokens::new("secret")));
//!     let client = WmsClient::new(ClientConfig::new("https://api.wms.example/v1"), tokens)?;
//!
//!     let me = client.fetch_me().await?;
//!     println!("Logged in as {}", me.name);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;

pub use api::ApiLayer;
pub use config::ClientConfig;
pub use error::ClientError;
pub use http::WmsClient;
