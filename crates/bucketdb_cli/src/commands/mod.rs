//! CLI command implementations.

pub mod compare;
pub mod copy;
pub mod export;
pub mod import;
pub mod inspect;
