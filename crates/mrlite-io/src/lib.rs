//! Collaborators named but left thin in spec.md §1: record-format
//! readers/writers, glob-based input matching, and the name→factory
//! registry used to instantiate a job's `mapper_class`/`reducer_class`.

pub mod matcher;
pub mod reader;
pub mod registry;
pub mod writer;

pub use matcher::expand as expand_glob;
pub use reader::{FramedReader, Reader, TextReader};
pub use registry::Registry;
pub use writer::{FramedWriter, TextWriter, Writer};
