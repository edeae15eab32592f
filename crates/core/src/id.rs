//! Strongly-typed identifiers used across the domain.
//!
//! Domain crates declare their own id newtypes over `uuid::Uuid` and derive the
//! boilerplate with [`impl_uuid_newtype!`](crate::impl_uuid_newtype):
//!
//! ```ignore
//! #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
//! #[serde(transparent)]
//! pub struct RecipeId(Uuid);
//!
//! larder_core::impl_uuid_newtype!(RecipeId, "RecipeId");
//! ```

/// Implement constructors, `Display`, `FromStr` and `Uuid` conversions for a
/// single-field `Uuid` newtype.
#[macro_export]
macro_rules! impl_uuid_newtype {
    ($t:ident, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered), so ids sort in creation order.
            pub fn new() -> Self {
                Self($crate::__uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: $crate::__uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &$crate::__uuid::Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$crate::__uuid::Uuid> for $t {
            fn from(value: $crate::__uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for $crate::__uuid::Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = <$crate::__uuid::Uuid as core::str::FromStr>::from_str(s)
                    .map_err(|e| $crate::DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}
