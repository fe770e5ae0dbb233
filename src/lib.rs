//! Minimal client for the Perplexity chat completions API.
//!
//! # Example
//! ```no_run
//! use perplexity_client::{chunk_text, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), perplexity_client::Error> {
//!     // Reads PPLX_API_KEY
//!     let client = Client::from_env()?;
//!
//!     let response = client
//!         .query("How many stars are there in our galaxy?")
//!         .send()
//!         .await?;
//!     println!("{response:#}");
//!
//!     let mut stream = client
//!         .stream_query("What is the distance to the moon?")
//!         .system("Answer in kilometres.")
//!         .send()
//!         .await?;
//!
//!     while let Some(chunk) = stream.next().await {
//!         if let Some(text) = chunk_text(&chunk?) {
//!             print!("{text}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod sse;
pub mod stream;
pub mod types;

pub use client::{Client, ClientBuilder, Query, StreamQuery, DEFAULT_TIMEOUT};
pub use config::{models, Config, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
pub use credentials::{ApiKey, CredentialSource, EnvCredentials, API_KEY_ENV};
pub use error::Error;
pub use stream::{QueryStream, ResponseStream};
pub use types::*;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
