//! Logging support

mod lazy_file_writer;
pub mod tracing;

pub use lazy_file_writer::{LazyFileWriter, LazyWriter};
