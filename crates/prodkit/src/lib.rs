//! Top-level facade crate for prodkit.
//!
//! Re-exports the core contracts and the runtime library so services can depend on a single crate.

pub mod core {
    pub use prodkit_core::*;
}

pub mod runtime {
    pub use prodkit_runtime::*;
}
