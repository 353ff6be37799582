//! Overlay template catalog for the quiz and annotation editor.
//!
//! The palette is static data: categories of overlay descriptors, each with an
//! example `preview` and the `template` instantiated when a user adds it.

pub mod catalog;
pub mod kind;

pub use catalog::{Catalog, CatalogError, Category, Location, OverlayData, OverlayDescriptor, PaletteError};
pub use kind::OverlayKind;
