#![forbid(unsafe_code)]

//! XAdES-BES enveloped signatures for electronic tax documents.
//!
//! A [`Signer`] takes a [`SigningContext`] (key material plus a fresh
//! identifier) and a [`TargetDocument`], and returns the document with a
//! `ds:Signature` appended as the last child of its root:
//!
//! ```text
//! ds:Signature Id="xmldsig-<id>"
//!   ds:SignedInfo           three References: document, KeyInfo, SignedProperties
//!   ds:SignatureValue       Id="xmldsig-<id>-sigvalue"
//!   ds:KeyInfo              Id="xmldsig-<id>-keyinfo"
//!   ds:Object
//!     xades:QualifyingProperties Target="#xmldsig-<id>"
//!       xades:SignedProperties   Id="xmldsig-<id>-signedprops"
//! ```

pub mod context;
pub mod fragment;
pub mod keyinfo;
pub mod options;
pub mod reference;
pub mod sign;
pub mod signed_info;
pub mod signed_props;

pub use context::{FixedId, IdGenerator, SigningContext, UuidGenerator};
pub use options::SignatureOptions;
pub use reference::{Reference, Transform};
pub use sign::{ErrorKind, SignError, SignedDocument, Signer, TargetDocument};
