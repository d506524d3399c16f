//! 거래소 커넥터.

pub mod coinbase_pro;

pub use coinbase_pro::*;
