//! Common types shared by the Spotify OAuth crates and the playlist gateway

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
