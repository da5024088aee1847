//! Blueprint Gateway - HTTP front end for the generation pipeline
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               Blueprint Gateway              │
//! ├──────────────────────────────────────────────┤
//! │  POST /api/generate   GET /downloads/<name>  │
//! │          │                     │             │
//! │  ┌───────▼────────┐    ┌───────▼────────┐    │
//! │  │ Generation     │    │ Static archive │    │
//! │  │ Pipeline       │───▶│ directory      │    │
//! │  └───────┬────────┘    └────────────────┘    │
//! │          │                                   │
//! │  provider → normalize → resolve →            │
//! │  materialize → archive                       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Environment config**: `.env` and process variables, validated at startup
//! - **Structured errors**: every failure answers `{success: false, error: {kind, message, retryable}}`
//! - **Graceful shutdown**: in-flight requests drain on SIGINT/SIGTERM

pub mod config;
pub mod error;
pub mod gateway;

pub use config::{AppEnv, GatewayConfig, ProviderSettings};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayState, GenerateResponse};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Default host
pub const DEFAULT_HOST: &str = "127.0.0.1";
