//! 계좌 이력과 주문/입금 요청을 위한 도메인 모델.

mod allocation;
mod entry;
mod order;

pub use allocation::*;
pub use entry::*;
pub use order::*;
