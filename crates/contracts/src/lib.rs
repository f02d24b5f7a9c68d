//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Ownership Model
//! - A `MetadataEvent` has exactly one owner; it is never `Clone`
//! - Duplicates are produced only through a `MetadataHandler`

mod blueprint;
mod error;
mod frame;
mod handler;
mod media_format;
mod metadata;
mod port;
mod report;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use handler::MetadataHandler;
pub use media_format::*;
pub use metadata::*;
pub use port::*;
pub use report::*;
