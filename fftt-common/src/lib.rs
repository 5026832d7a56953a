//! # FFTT Common Library
//!
//! Shared code for the FFTT licence proxy:
//! - Request signing for the federation registry (session id, `tm`, `tmc`)
//! - Registry HTTP client
//! - XML response mapping into player records
//! - Configuration loading and validation
//! - Error types

pub mod client;
pub mod config;
pub mod error;
pub mod mapper;
pub mod signer;

pub use client::RegistryClient;
pub use error::{Error, LookupError, Result};
pub use mapper::{map_player, PlayerRecord};
pub use signer::{SessionId, SharedSecret, SignedParams, Signer};
