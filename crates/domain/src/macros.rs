//! Macro for implementing Display and FromStr for small domain enums
//!
//! Request methods, callback modes and lifecycle states all need a stable
//! string form for logs and configuration files. This macro provides both
//! directions from a single variant table.
//!
//! # Example
//!
//! ```rust
//! use courier_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Mode {
//!     Inline,
//!     Detached,
//! }
//!
//! impl_domain_enum_conversions!(Mode {
//!     Inline => "inline",
//!     Detached => "detached",
//! });
//!
//! assert_eq!("DETACHED".parse::<Mode>().unwrap(), Mode::Detached);
//! ```

/// Implements Display and FromStr traits for unit-variant enums
///
/// This macro generates:
/// - Display trait: writes the mapped string verbatim
/// - FromStr trait: parses ASCII case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return ::std::result::Result::Ok(Self::$variant);
                    }
                )+
                ::std::result::Result::Err(::std::format!(
                    "Invalid {}: {}",
                    stringify!($enum_name),
                    s
                ))
            }
        }
    };
}
