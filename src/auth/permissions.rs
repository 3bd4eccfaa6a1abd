use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Capability bitmask carried by a token.
///
/// Bit 0 is unused so the values match the tokens already issued by the
/// deployed service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(u64);

const NAMED: [(Permissions, &str); 6] = [
    (Permissions::CREATE_PREFERENCE, "CREATE_PREFERENCE"),
    (Permissions::UPDATE_PREFERENCE, "UPDATE_PREFERENCE"),
    (Permissions::DELETE_PREFERENCE, "DELETE_PREFERENCE"),
    (Permissions::CREATE_BLOQ, "CREATE_BLOQ"),
    (Permissions::UPDATE_BLOQ, "UPDATE_BLOQ"),
    (Permissions::DELETE_BLOQ, "DELETE_BLOQ"),
];

impl Permissions {
    pub const NO_PERMISSIONS: Self = Self(0);
    pub const CREATE_PREFERENCE: Self = Self(1 << 1);
    pub const UPDATE_PREFERENCE: Self = Self(1 << 2);
    pub const DELETE_PREFERENCE: Self = Self(1 << 3);
    pub const CREATE_BLOQ: Self = Self(1 << 4);
    pub const UPDATE_BLOQ: Self = Self(1 << 5);
    pub const DELETE_BLOQ: Self = Self(1 << 6);

    pub const PREFERENCE_MANAGER: Self = Self(
        Self::CREATE_PREFERENCE.0 | Self::UPDATE_PREFERENCE.0 | Self::DELETE_PREFERENCE.0,
    );
    pub const BLOQ_MANAGER: Self =
        Self(Self::CREATE_BLOQ.0 | Self::UPDATE_BLOQ.0 | Self::DELETE_BLOQ.0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NO_PERMISSIONS");
        }
        let mut rest = self.0;
        let mut first = true;
        for (bit, name) in NAMED {
            if self.contains(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                rest &= !bit.0;
                first = false;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{rest:#x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn managers_are_unions() {
        assert_eq!(
            Permissions::PREFERENCE_MANAGER,
            Permissions::CREATE_PREFERENCE
                | Permissions::UPDATE_PREFERENCE
                | Permissions::DELETE_PREFERENCE
        );
        assert_eq!(Permissions::BLOQ_MANAGER.bits(), 0b111_0000);
        assert_eq!(
            Permissions::PREFERENCE_MANAGER & Permissions::BLOQ_MANAGER,
            Permissions::NO_PERMISSIONS
        );
    }

    #[test]
    fn display_names_bits() {
        assert_eq!(Permissions::NO_PERMISSIONS.to_string(), "NO_PERMISSIONS");
        assert_eq!(
            (Permissions::CREATE_BLOQ | Permissions::from_bits(1 << 40)).to_string(),
            "CREATE_BLOQ|0x10000000000"
        );
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&Permissions::PREFERENCE_MANAGER).unwrap();
        assert_eq!(json, "14");
        let back: Permissions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Permissions::PREFERENCE_MANAGER);
    }

    proptest! {
        #[test]
        fn union_contains_both(a in any::<u64>(), b in any::<u64>()) {
            let (a, b) = (Permissions::from_bits(a), Permissions::from_bits(b));
            prop_assert!((a | b).contains(a));
            prop_assert!((a | b).contains(b));
        }

        #[test]
        fn empty_holder_contains_only_empty(bits in 1u64..) {
            prop_assert!(!Permissions::NO_PERMISSIONS.contains(Permissions::from_bits(bits)));
        }
    }
}
