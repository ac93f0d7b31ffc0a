//! # docsift-core
//!
//! Core types, traits and errors shared by the docsift crates.
//!
//! ## Pipeline
//!
//! ```text
//! SourceDocument → detect → DocumentFormat → ContentExtractor → normalize → ExtractionResult
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SourceDocument`] | Buffered bytes plus a filename hint |
//! | [`DocumentFormat`] | Closed set of supported formats |
//! | [`ExtractedText`] | Raw text from one extractor |
//! | [`ExtractionResult`] | Normalized text, canonical MIME type, method |
//! | [`ExtractError`] | Unsupported, parse, or internal failure |
//!
//! ## Related Crates
//!
//! - `docsift-extract`: detection, dispatch and the format extractors
//! - `docsift`: command-line front end

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, ExtractError, Result};
pub use traits::*;
pub use types::*;
