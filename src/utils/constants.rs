/// Defaults and display limits

/// Off-chain API used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// JSON-RPC endpoint for the on-chain registry
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// Semaphore contract address (Sepolia deployment)
pub const DEFAULT_SEMAPHORE_ADDRESS: &str = "0x3889927F0B5Eb1a02C6E2C20b39a1Bd4EAd76131";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Member ids longer than this are shortened for display
pub const MEMBER_ID_DISPLAY_MAX: usize = 16;

/// Characters kept on each side of a shortened member id
pub const MEMBER_ID_DISPLAY_EDGE: usize = 8;

/// Environment overrides
pub const ENV_API_URL: &str = "BANDADA_API_URL";
pub const ENV_RPC_URL: &str = "BANDADA_RPC_URL";
pub const ENV_SEMAPHORE_ADDRESS: &str = "BANDADA_SEMAPHORE_ADDRESS";
pub const ENV_SESSION_COOKIE: &str = "BANDADA_SESSION_COOKIE";
