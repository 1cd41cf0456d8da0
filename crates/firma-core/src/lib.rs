#![forbid(unsafe_code)]

//! Core types for the firma signing engine: the shared error type,
//! algorithm URIs, and namespace/element-name constants for XML-DSig and
//! XAdES.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
