//! Command implementations for the coref-markup CLI
//!
//! Each command has its own module with its arguments and a `run` function.

pub mod agreement;
pub mod clean;
pub mod diff;
pub mod majority;
pub mod merge;

// Re-export argument types for parser
pub use agreement::AgreementArgs;
pub use clean::CleanArgs;
pub use diff::DiffArgs;
pub use majority::MajorityArgs;
pub use merge::MergeArgs;
