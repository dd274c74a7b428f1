//! Command implementations

pub mod patterns;
pub mod scan;
pub mod validate;
