//! First-come-first-served file naming.
//!
//! Full-length (12 character) names without a dot are free for anyone to
//! claim. Short names and dotted names compete with account names, so they
//! go through the name-auction registry:
//!
//! - an open auction on the suffix blocks everyone, including the leader;
//! - a closed auction hands the suffix to the winning bidder;
//! - with no auction, the suffix account itself may claim the name, and an
//!   undotted name may also be claimed while no such account exists.

use crate::error::{Error, Result};
use crate::name::Name;
use crate::system::NameRegistry;
use tracing::debug;

/// Length at which a name no longer carries an implicit trailing suffix.
pub const FULL_NAME_LEN: usize = 12;

/// Check that `owner` may claim `filename`.
///
/// The filename length must already have been validated by the caller.
pub fn authorize_filename(
    owner: Name,
    filename: Name,
    registry: &dyn NameRegistry,
) -> Result<()> {
    let suffix = filename.suffix();
    let is_short = filename.length() < FULL_NAME_LEN;

    if suffix == filename && !is_short {
        return Ok(());
    }

    match registry.name_bid(suffix) {
        Some(bid) => {
            if bid.is_open() {
                return Err(Error::auction_open(suffix));
            }
            if bid.high_bidder != owner {
                return Err(Error::suffix_not_owned(owner, suffix));
            }
            debug!(%owner, %filename, %suffix, "suffix auction won by owner");
        }
        None => {
            let unclaimed = suffix == filename && !registry.is_account(suffix);
            if owner != suffix && !unclaimed {
                return Err(Error::suffix_not_owned(owner, suffix));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{NameBid, SystemRegistry};

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn bid(newname: &str, bidder: &str, amount: i64) -> NameBid {
        NameBid {
            newname: name(newname),
            high_bidder: name(bidder),
            high_bid: amount,
            last_bid_time: 0,
        }
    }

    #[test]
    fn test_full_length_name_skips_registry() {
        let mut registry = SystemRegistry::new();
        // Even an open auction on the exact name is irrelevant
        registry.place_bid(bid("abcdefghijkl", "bob", 100));
        registry.add_account(name("abcdefghijkl"));

        assert!(authorize_filename(name("alice"), name("abcdefghijkl"), &registry).is_ok());
    }

    #[test]
    fn test_open_auction_blocks_everyone() {
        let mut registry = SystemRegistry::new();
        registry.place_bid(bid("bob", "alice", 0));

        for caller in ["alice", "bob", "carol"] {
            let err = authorize_filename(name(caller), name("bob"), &registry).unwrap_err();
            assert!(matches!(err, Error::AuctionOpen { .. }));

            let err = authorize_filename(name(caller), name("files.bob"), &registry).unwrap_err();
            assert!(matches!(err, Error::AuctionOpen { .. }));
        }
    }

    #[test]
    fn test_closed_auction_belongs_to_winner() {
        let mut registry = SystemRegistry::new();
        registry.place_bid(bid("bob", "alice", -50_000));

        assert!(authorize_filename(name("alice"), name("bob"), &registry).is_ok());
        assert!(authorize_filename(name("alice"), name("x.bob"), &registry).is_ok());

        let err = authorize_filename(name("bob"), name("bob"), &registry).unwrap_err();
        assert!(matches!(err, Error::SuffixNotOwned { .. }));
    }

    #[test]
    fn test_no_bid_suffix_account_may_claim() {
        let mut registry = SystemRegistry::new();
        registry.add_account(name("bob"));

        assert!(authorize_filename(name("bob"), name("bob"), &registry).is_ok());
        assert!(authorize_filename(name("bob"), name("data.bob"), &registry).is_ok());

        let err = authorize_filename(name("alice"), name("bob"), &registry).unwrap_err();
        assert!(matches!(err, Error::SuffixNotOwned { .. }));
        let err = authorize_filename(name("alice"), name("data.bob"), &registry).unwrap_err();
        assert!(matches!(err, Error::SuffixNotOwned { .. }));
    }

    #[test]
    fn test_no_bid_unregistered_short_name_is_free() {
        let registry = SystemRegistry::new();

        assert!(authorize_filename(name("alice"), name("myfile"), &registry).is_ok());
    }

    #[test]
    fn test_no_bid_dotted_name_needs_suffix_owner() {
        // The suffix account does not exist, but dotted names are never free
        let registry = SystemRegistry::new();

        let err = authorize_filename(name("alice"), name("my.file"), &registry).unwrap_err();
        assert!(matches!(err, Error::SuffixNotOwned { .. }));
        assert!(authorize_filename(name("file"), name("my.file"), &registry).is_ok());
    }

    #[test]
    fn test_full_length_dotted_name_is_checked() {
        let registry = SystemRegistry::new();

        let err =
            authorize_filename(name("alice"), name("abcdef.ghijk"), &registry).unwrap_err();
        assert!(matches!(err, Error::SuffixNotOwned { .. }));
        assert!(authorize_filename(name("ghijk"), name("abcdef.ghijk"), &registry).is_ok());
    }
}
