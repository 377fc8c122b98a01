//! # gppcodec: GPP consent string codec
//!
//! Encode and decode Global Privacy Platform strings: a header listing section ids followed by
//! one encoded consent signal per section, joined by `~`.
//!
//! ## Layers
//!
//! - **Primitives** ([`primitive`]): integers, longs, bitfields, strings, datetimes, Fibonacci
//!   codes and integer ranges, each to and from a `'0'`/`'1'` bit-string
//! - **Base64url** ([`base64url`]): packs bit-strings into the URL-safe alphabet
//! - **Fields** ([`datatype`], [`fields`], [`codec`]): typed slots and the ordered encoder
//!   that concatenates them
//! - **Segments and sections** ([`segment`], [`section`], [`sections`]): cached wire strings
//!   with dirty tracking, per-signal field tables and validators
//! - **Model** ([`model`], [`frame`]): the whole GPP string, strict or lenient
//!
//! ## Example
//!
//! ```no_run
//! use gppcodec::{GppModel, Value};
//!
//! let mut model = GppModel::new();
//! model.set_field_value("uspv1", "Notice", Value::Char('Y')).unwrap();
//! let encoded = model.encode().unwrap();
//! let back = GppModel::from_encoded(&encoded).unwrap();
//! assert_eq!(back.get_field_value("uspv1", "Notice").unwrap(), Some(&Value::Char('Y')));
//! ```
//!
//! Vendor names and versions for TCF come from a Global Vendor List, see [`gvl`].

pub mod base64url;
pub mod codec;
pub mod datatype;
pub mod dump;
pub mod fields;
pub mod frame;
pub mod gvl;
pub mod model;
pub mod primitive;
pub mod section;
pub mod sections;
pub mod segment;
pub mod value;

pub use base64url::{Base64UrlEncoder, Base64Variant, CompressedBase64UrlEncoder, TraditionalBase64UrlEncoder};
pub use codec::{BitStringEncoder, ErrorKind, GppError, Result};
pub use datatype::{DataType, FieldKind, Validator};
pub use fields::Fields;
pub use frame::{decode_gpp_frame, encode_frame_with_compliant_only, FrameDecodeResult};
pub use gvl::{Gvl, GvlCache};
pub use model::GppModel;
pub use section::EncodableSection;
pub use sections::{HeaderV1, TcfEuV2, UsSection, UspV1};
pub use segment::{BitStringSegment, EncodableSegment};
pub use value::{RangeEntry, Value};
