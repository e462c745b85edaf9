//! # Request and Response Models
//!
//! This module defines the shapes that cross the engine's outer edge.
//! These are separate from database models so the wire format can differ
//! from the stored one.
//!
//! ## Organization
//!
//! - `requests.rs` - Incoming operation arguments
//! - `responses.rs` - Outgoing results and the response envelope
//!
//! ## Serialization
//!
//! All models use Serde for JSON serialization/deserialization.
//! Field names are converted to camelCase; amounts travel as strings.

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;
