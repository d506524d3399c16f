//! 반복 주기 기반 멱등성 판단.
//!
//! 거래소 자체의 입금/체결 이력만으로 "이번 주기에 이미 실행했는가"를 매번
//! 다시 계산합니다. 별도의 카운터나 저장 상태는 없습니다.

mod decision;
mod matcher;
mod tolerance;
mod window;

pub use decision::*;
pub use matcher::*;
pub use tolerance::*;
pub use window::*;
