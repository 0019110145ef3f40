//! Core subsystems shared by the GVFS service: the placeholder catalog, the volume
//! watcher, the mount supervisor, and the ref repair engine.

pub mod catalog;
pub mod error;
pub mod mount;
pub mod refs;
pub mod volume_watch;

pub use error::{GvfsError, Result};
