use std::time::Duration;

// ======= Chain clients =======

/// Deadline applied to every single network operation.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline applied to exchange HTTP requests.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for a full commit-reveal broadcast, account lookup included.
pub const TX_TIMEOUT: Duration = Duration::from_secs(15);

/// How often oracle params are re-queried, boundary-triggered refreshes
/// aside. Must stay at or below one voting period.
pub const PARAMS_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub const WS_RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const WS_RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

// ======= Addresses and keys =======

pub const ACCOUNT_ADDRESS_PREFIX: &str = "vsc";
pub const VALIDATOR_ADDRESS_PREFIX: &str = "vscvaloper";

/// BIP-44 coin type of the chain's eth-flavoured accounts.
pub const BIP44_COIN_TYPE: u32 = 60;

// ======= Voting =======

/// The commit hash is the truncated SHA-256 over the canonical vote string.
pub const VOTE_HASH_BYTES: usize = 20;

/// Exchange rates are rendered with the chain's fixed-point precision.
pub const EXCHANGE_RATE_DECIMALS: usize = 18;

/// Outlier rejection keeps values within this many standard deviations of
/// the mean. A single extreme value inflates sigma enough to protect itself;
/// that weakness is pinned by tests, so treat changes as consensus-visible.
pub const OUTLIER_SIGMA_FACTOR: f64 = 1.0;

// ======= Transactions =======

pub const FEE_DENOM: &str = "uvsc";
pub const TX_FEE_AMOUNT: u64 = 5_000;
pub const TX_GAS_LIMIT: u64 = 400_000;

// ======= Metrics =======

pub const METRICS_PORT: u16 = 8080;
