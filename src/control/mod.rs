//! Control structures.
//!
//! - [`Continuation`]: continuation-passing style with one-shot call/cc
//! - [`zip_option`] / [`zip_result`] and their 3..10-ary forms: tuple-building
//!   for `Option` and `Result`
//! - [`ResultExt`]: observation taps and pairing for `Result`
//!
//! # Examples
//!
//! ```rust
//! use deferral::control::{ResultExt, zip_result3};
//!
//! let parsed = zip_result3("1".parse::<u8>(), "2".parse::<u8>(), "3".parse::<u8>());
//! assert_eq!(parsed, Ok((1, 2, 3)));
//!
//! let paired = Ok::<_, String>(1).concat(Ok("one"));
//! assert_eq!(paired, Ok((1, "one")));
//! ```

mod continuation;
mod result_ext;
mod zip;

pub use continuation::{Continuation, Rest};
pub use result_ext::ResultExt;
pub use zip::{
    zip_option, zip_option3, zip_option4, zip_option5, zip_option6, zip_option7, zip_option8,
    zip_option9, zip_option10, zip_result, zip_result3, zip_result4, zip_result5, zip_result6,
    zip_result7, zip_result8, zip_result9, zip_result10,
};
