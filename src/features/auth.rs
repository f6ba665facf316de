use std::collections::HashSet;

use super::account::UserId;

/// Pluggable authorization policy for administrative operations. The ledger
/// core only ever asks one question: may this caller decide on transactions?
pub trait AdminPolicy {
    fn is_administrator(&self, user_id: &UserId) -> bool;
}

/// Static allow-list of administrator identities.
#[derive(Debug, Default)]
pub struct AllowListPolicy {
    admins: HashSet<UserId>,
}

impl AllowListPolicy {
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl AdminPolicy for AllowListPolicy {
    fn is_administrator(&self, user_id: &UserId) -> bool {
        self.admins.contains(user_id)
    }
}
