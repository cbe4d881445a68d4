//! Public disk API client

pub mod client;
pub mod errors;
pub mod types;

pub use client::PublicDiskClient;
pub use errors::AccessError;
pub use types::*;
