//! Newtype IDs for type-safe entity references.
//!
//! The commerce engine's `ID` scalar is an opaque string, so every wrapper
//! holds a `String`. Use the `define_id!` macro to create wrappers that
//! prevent accidentally passing a shipping method ID where a variant ID is
//! expected.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use quayside_core::define_id;
/// define_id!(LineId);
/// define_id!(ZoneId);
///
/// let line = LineId::new("12");
/// let zone = ZoneId::new("12");
///
/// // These are different types, so this won't compile:
/// // let _: LineId = zone;
/// assert_eq!(line.as_str(), zone.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Engine entity IDs
define_id!(ProductId);
define_id!(VariantId);
define_id!(OrderId);
define_id!(OrderLineId);
define_id!(ShippingMethodId);
define_id!(PaymentMethodId);
define_id!(CustomerId);
define_id!(ZoneId);
define_id!(JobId);

// Payment provider IDs
define_id!(PaymentIntentId);

// Human-facing order reference shown on the confirmation page.
define_id!(OrderCode);
