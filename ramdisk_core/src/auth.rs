//! Caller authentication.
//!
//! Signature verification belongs to the host. Actions only ask whether the
//! call carries the authority of a given account.

use crate::name::Name;
use std::collections::BTreeSet;

/// Answers whether the current call is authorized by an account.
pub trait Authenticator {
    /// True if the caller proved control of `account`.
    fn authenticate(&self, account: Name) -> bool;
}

/// The set of accounts whose authority accompanies a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerSet {
    signers: BTreeSet<Name>,
}

impl SignerSet {
    /// Create an empty signer set (authenticates nobody).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signer set for a single account.
    pub fn single(account: Name) -> Self {
        let mut set = Self::new();
        set.insert(account);
        set
    }

    /// Add a signer. The empty name never authenticates and is ignored.
    pub fn insert(&mut self, account: Name) {
        if !account.is_empty() {
            self.signers.insert(account);
        }
    }

    /// Iterate over the signers in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Name> {
        self.signers.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

impl FromIterator<Name> for SignerSet {
    fn from_iter<I: IntoIterator<Item = Name>>(iter: I) -> Self {
        let mut set = Self::new();
        for account in iter {
            set.insert(account);
        }
        set
    }
}

impl Authenticator for SignerSet {
    fn authenticate(&self, account: Name) -> bool {
        self.signers.contains(&account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_set_authenticates_members_only() {
        let alice = Name::parse("alice").unwrap();
        let bob = Name::parse("bob").unwrap();
        let signers = SignerSet::single(alice);

        assert!(signers.authenticate(alice));
        assert!(!signers.authenticate(bob));
    }

    #[test]
    fn test_signer_set_ignores_empty_name() {
        let signers: SignerSet = [Name::EMPTY].into_iter().collect();
        assert!(signers.is_empty());
        assert!(!signers.authenticate(Name::EMPTY));
    }
}
