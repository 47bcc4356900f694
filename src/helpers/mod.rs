//! Shared helpers for reading zip packages and their XML parts.

pub(crate) mod reader;
pub mod xml;
pub(crate) mod zip;
