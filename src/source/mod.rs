//! Loading of raw sensor tables from disk.
//!
//! This module turns JSON, JSON Lines and CSV exports into a [`RawTable`]:
//! named columns with untyped cells. Typing, cleaning and normalization
//! happen later in [`crate::core`].

pub mod reader;
pub mod types;

// Re-export commonly used types
pub use reader::{load_table, SourceError};
pub use types::RawTable;
