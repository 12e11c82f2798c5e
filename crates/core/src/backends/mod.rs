//! Concrete collaborator backends.

pub mod local;

pub use local::LocalBackend;
