pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Leading zero hex characters a proof digest must carry.
pub const POW_DIFFICULTY: u32 = 4;

pub const GENESIS_INDEX: u64 = 1;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";
pub const GENESIS_TIMESTAMP: u64 = 0;

/// Sender recorded on the reward transaction of a mined block.
pub const REWARD_SENDER: &str = "0";
pub const MINING_REWARD: u64 = 1;
