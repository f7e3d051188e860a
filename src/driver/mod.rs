//! The compiler driver: argument parsing, the per-file pipeline, and the
//! final link.

mod cli;
mod driver;
mod file_types;
mod link;

pub use driver::{Cpu, Driver, Phase, TargetOs};
pub use file_types::{classify, FileEntry, FileKind};
