//! Civilization VII mod ingestion: archive extraction, `.modinfo` parsing,
//! installation into a managed storage root and file-conflict analysis.

pub mod archive;
pub mod cli;
pub mod config;
pub mod conflicts;
pub mod deploy;
pub mod error;
pub mod installer;
pub mod library;
pub mod metadata;

pub use error::{ArchiveError, InstallError, ParseError, UnrarError};
pub use installer::{BatchSummary, Installer, OverwritePolicy};
pub use metadata::{ActionKind, ModDescriptor};
