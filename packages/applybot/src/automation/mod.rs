//! Posting sources and browser automation backends.

pub mod file;
pub mod sidecar;

pub use file::JsonFileFetcher;
pub use sidecar::{SidecarClient, SidecarSession};
