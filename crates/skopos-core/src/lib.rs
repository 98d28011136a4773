//! # Skopos Core
//!
//! Core types shared by the Skopos container image update watcher.
//!
//! This crate provides the foundational data structures used throughout the
//! Skopos ecosystem, including:
//!
//! - [`ContainerImage`] - Descriptor of a watched image and the registry it lives in
//! - [`RegistryRef`] - Registry name and endpoint URL attached to an image
//! - [`mask`] - Redaction of secrets for display
//! - [`ValidationError`] - Field-level configuration validation failures
//!
//! ## Example
//!
//! ```rust
//! use skopos_core::{mask, ContainerImage};
//!
//! let image = ContainerImage::parse("ghcr.io/acme/api:1.4.2").unwrap();
//! assert_eq!(image.registry.url, "ghcr.io");
//! assert_eq!(image.name, "acme/api");
//! assert_eq!(image.tag.as_deref(), Some("1.4.2"));
//!
//! assert_eq!(mask("secretaccesskey"), "s*************y");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod image;
pub mod mask;
pub mod validation;

#[cfg(test)]
mod proptest_tests;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use image::{ContainerImage, RegistryRef};
pub use mask::{mask, MASK_CHAR};
pub use validation::{ValidationError, ValidationErrorKind};
