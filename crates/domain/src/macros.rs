//! Wire-name conversions for small domain enums
//!
//! Many enums in this crate travel as plain strings: in query parameters,
//! in CLI arguments and in log fields. `impl_wire_name!` gives each of them a
//! stable `as_str`, a `Display` that writes the same text, and a
//! case-insensitive `FromStr`.
//!
//! # Example
//!
//! ```rust
//! use stockbridge_domain::impl_wire_name;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Direct,
//!     Proxy,
//! }
//!
//! impl_wire_name!(Channel {
//!     Direct => "direct",
//!     Proxy => "proxy",
//! });
//!
//! assert_eq!(Channel::Direct.as_str(), "direct");
//! assert_eq!("PROXY".parse::<Channel>().unwrap(), Channel::Proxy);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum.
///
/// Wire names must be given in lowercase; parsing lowercases its input
/// before matching.
#[macro_export]
macro_rules! impl_wire_name {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable wire name of this variant.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
