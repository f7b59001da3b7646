//! Value Objects - Identifiers shared by every bounded context
//!
//! Identifiers are:
//! - Immutable
//! - Comparable by value
//! - Distinct types, so a `UserId` can never be passed where a `CompanyId` is expected

use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Inner UUID
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse from the hyphenated string form
            pub fn parse(value: &str) -> DomainResult<Self> {
                Uuid::parse_str(value)
                    .map(Self)
                    .map_err(|_| DomainError::InvalidId {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Tenant (company) identifier
    CompanyId,
    "company"
);
uuid_id!(
    /// User account identifier
    UserId,
    "user"
);
uuid_id!(
    /// Support ticket identifier
    TicketId,
    "ticket"
);
uuid_id!(
    /// Ticket comment identifier
    CommentId,
    "comment"
);
uuid_id!(
    /// Employee record identifier
    EmployeeId,
    "employee"
);
uuid_id!(
    /// Inventory product identifier
    ProductId,
    "product"
);
