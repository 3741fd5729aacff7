//! Tuple-building helpers for `Option` and `Result`.
//!
//! `zip_option*` yields `Some` only when every argument is `Some`.
//! `zip_result*` yields `Ok` only when every argument is `Ok`; otherwise the
//! first `Err` in argument order.
//!
//! # Examples
//!
//! ```rust
//! use deferral::control::{zip_option3, zip_result};
//!
//! assert_eq!(zip_option3(Some(1), Some("a"), Some('x')), Some((1, "a", 'x')));
//! assert_eq!(zip_option3(Some(1), None::<&str>, Some('x')), None);
//!
//! let parsed = zip_result("1".parse::<i32>(), "two".parse::<i32>());
//! assert!(parsed.is_err());
//! ```

macro_rules! define_tuple_zips {
    ($option_name:ident, $result_name:ident; $($value:ident: $type:ident),+) => {
        #[doc = concat!("Combines ", stringify!($($value),+), " into one `Option` of a tuple.")]
        #[must_use]
        pub fn $option_name<$($type),+>($($value: Option<$type>),+) -> Option<($($type,)+)> {
            Some(($($value?,)+))
        }

        #[doc = concat!("Combines ", stringify!($($value),+), " into one `Result` of a tuple.")]
        ///
        /// # Errors
        ///
        /// Returns the first `Err` in argument order.
        pub fn $result_name<$($type,)+ Error>(
            $($value: Result<$type, Error>),+
        ) -> Result<($($type,)+), Error> {
            Ok(($($value?,)+))
        }
    };
}

define_tuple_zips!(zip_option, zip_result; first: A, second: B);
define_tuple_zips!(zip_option3, zip_result3; first: A, second: B, third: C);
define_tuple_zips!(zip_option4, zip_result4; first: A, second: B, third: C, fourth: D);
define_tuple_zips!(
    zip_option5, zip_result5;
    first: A, second: B, third: C, fourth: D, fifth: E
);
define_tuple_zips!(
    zip_option6, zip_result6;
    first: A, second: B, third: C, fourth: D, fifth: E, sixth: F
);
define_tuple_zips!(
    zip_option7, zip_result7;
    first: A, second: B, third: C, fourth: D, fifth: E, sixth: F, seventh: G
);
define_tuple_zips!(
    zip_option8, zip_result8;
    first: A, second: B, third: C, fourth: D, fifth: E, sixth: F, seventh: G, eighth: H
);
define_tuple_zips!(
    zip_option9, zip_result9;
    first: A, second: B, third: C, fourth: D, fifth: E, sixth: F, seventh: G, eighth: H,
    ninth: I
);
define_tuple_zips!(
    zip_option10, zip_result10;
    first: A, second: B, third: C, fourth: D, fifth: E, sixth: F, seventh: G, eighth: H,
    ninth: I, tenth: J
);
