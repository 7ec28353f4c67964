//! File records.

use crate::name::Name;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who controls a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "account", rename_all = "snake_case")]
pub enum Owner {
    /// The account allowed to mutate the file.
    Account(Name),
    /// Nobody. The file can never change again.
    Immutable,
}

impl Owner {
    /// The controlling account, unless the file is immutable.
    pub fn account(&self) -> Option<Name> {
        match self {
            Owner::Account(account) => Some(*account),
            Owner::Immutable => None,
        }
    }

    pub fn is_immutable(&self) -> bool {
        matches!(self, Owner::Immutable)
    }

    /// True if `account` controls the file. Always false once immutable.
    pub fn is(&self, account: Name) -> bool {
        self.account() == Some(account)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Account(account) => write!(f, "{}", account),
            Owner::Immutable => f.write_str("(immutable)"),
        }
    }
}

/// The single record kept for each file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub owner: Owner,
    /// Account billed for the file's storage (its creator).
    pub payer: Name,
}

impl FileRecord {
    /// A new file owned and paid for by `owner`.
    pub fn new(owner: Name) -> Self {
        Self {
            owner: Owner::Account(owner),
            payer: owner,
        }
    }

    /// Give up ownership for good.
    pub(crate) fn make_immutable(&mut self) {
        self.owner = Owner::Immutable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_account() {
        let alice = Name::parse("alice").unwrap();
        let mut record = FileRecord::new(alice);

        assert!(record.owner.is(alice));
        assert_eq!(record.owner.to_string(), "alice");

        record.make_immutable();
        assert!(record.owner.is_immutable());
        assert!(!record.owner.is(alice));
        assert!(!record.owner.is(Name::EMPTY));
        assert_eq!(record.payer, alice);
        assert_eq!(record.owner.to_string(), "(immutable)");
    }

    #[test]
    fn test_owner_serde() {
        let owner = Owner::Account(Name::parse("alice").unwrap());
        let json = serde_json::to_string(&owner).unwrap();
        assert_eq!(json, r#"{"kind":"account","account":"alice"}"#);

        let json = serde_json::to_string(&Owner::Immutable).unwrap();
        assert_eq!(json, r#"{"kind":"immutable"}"#);
        let parsed: Owner = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Owner::Immutable);
    }
}
