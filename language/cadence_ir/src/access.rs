//! Access modifiers.

use std::fmt;

/// Declared access level of a member or declaration.
///
/// Ordered from most restrictive to least: `SelfOnly < Contract < Account
/// < Public`. Override checking uses this order: an implementation may not
/// narrow the access its interface declared.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum Access {
    /// `priv` / `access(self)`: only the declaring composite.
    SelfOnly,
    /// `access(contract)`: any code in the same contract.
    Contract,
    /// `access(account)`: any code deployed to the same account.
    Account,
    /// `pub` / `access(all)`: readable everywhere.
    #[default]
    Public,
}

impl Access {
    /// Whether this access level admits at least the callers `other` does.
    #[inline]
    pub fn is_at_least_as_permissive(self, other: Access) -> bool {
        self >= other
    }

    /// Keyword as written in source, for diagnostics.
    pub fn keyword(self) -> &'static str {
        match self {
            Access::SelfOnly => "priv",
            Access::Contract => "access(contract)",
            Access::Account => "access(account)",
            Access::Public => "pub",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_order() {
        assert!(Access::Public.is_at_least_as_permissive(Access::Contract));
        assert!(Access::Account.is_at_least_as_permissive(Access::Account));
        assert!(!Access::SelfOnly.is_at_least_as_permissive(Access::Public));
        assert!(!Access::Contract.is_at_least_as_permissive(Access::Account));
    }
}
