//! 테스트와 드라이런 검증을 위한 시뮬레이션 거래소.
//!
//! 이 모듈은 다음 기능을 제공하는 시뮬레이션 거래소입니다:
//! - 결제 수단, 계좌, 원장/이체 이력 시드
//! - 매수 시 체결/수수료 원장 항목 생성 및 잔고 차감
//! - 작업별 실패 주입
//!
//! # 예제
//!
//! ```ignore
//! use hodl_exchange::simulated::{SimulatedConfig, SimulatedExchange};
//!
//! let config = SimulatedConfig::default()
//!     .with_payment_method("pm-1", "Checking", "ach_bank_account", "USD")
//!     .with_account("usd-1", "USD", dec!(500))
//!     .with_fee_rate(dec!(0.005));
//!
//! let exchange = SimulatedExchange::new(config);
//! let methods = exchange.list_payment_methods().await?;
//! ```

mod exchange;

pub use exchange::{SimulatedConfig, SimulatedExchange, SimulatedOperation};
