pub mod runtime;

pub use runtime::{ensure_java, locate_java_binary, resolve_java, runtime_dir, JreSource, JRE_TABLE};
