//! 거래소 연결.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Exchange trait: 정기 입금/매수에 필요한 거래소 인터페이스
//! - Coinbase Pro 커넥터 (REST, 요청 서명, 페이지네이션)
//! - 시뮬레이션 거래소 (테스트 및 드라이런 검증용)
//! - 거래소 에러 분류

pub mod connector;
pub mod error;
pub mod simulated;
pub mod traits;

pub use connector::{CoinbaseProClient, CoinbaseProConfig};
pub use error::*;
pub use simulated::{SimulatedConfig, SimulatedExchange, SimulatedOperation};
pub use traits::*;
