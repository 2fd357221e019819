//! Run-scoped context.

mod identity;

pub use identity::RunIdentity;
