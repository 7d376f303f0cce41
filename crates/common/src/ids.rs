use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Each identifier gets its own type so an order id can never be passed
/// where a line item id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the nil identifier, used as a null reference.
            pub fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Returns true if this is the nil identifier.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of an order.
    OrderId
);

uuid_id!(
    /// Identifier of a line item.
    LineItemId
);

uuid_id!(
    /// Identifier of the store an order belongs to.
    StoreId
);

uuid_id!(
    /// Identifier of a user account.
    UserId
);

uuid_id!(
    /// Identifier of a customer profile (billing, shipping).
    ProfileId
);

uuid_id!(
    /// Identifier of a promotion.
    PromotionId
);

uuid_id!(
    /// Identifier of a coupon.
    CouponId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_unique_ids() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = PromotionId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn test_nil_is_detected() {
        assert!(UserId::nil().is_nil());
        assert!(!UserId::new().is_nil());
    }

    #[test]
    fn test_parses_from_display_form() {
        let id = CouponId::new();
        let parsed: CouponId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<CouponId>().is_err());
    }

    #[test]
    fn test_serializes_as_bare_uuid() {
        let id = LineItemId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let deserialized: LineItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
