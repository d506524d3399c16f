//! # Hodl Core
//!
//! 정기 입금 및 자산 배분 매수 봇의 핵심 도메인 모델과 결정 로직을 제공합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 계좌 원장 항목 및 주문 요약 타입
//! - 자산 배분 계산 (`AllocationWeights` → `AllocationPlan`)
//! - 반복 주기 윈도우, 허용 오차, 이력 매칭 및 실행 여부 결정
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod recurrence;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use recurrence::*;
pub use types::*;
