//! 정기 입금 및 배분 매수 실행.
//!
//! 이 crate는 다음을 제공합니다:
//! - 결제 수단/계좌 확인, 입금 단계, 매수 단계를 순서대로 수행하는 실행기
//! - 사람이 읽는 상태 메시지 출력을 위한 sink
//! - 단계별 결과를 담은 실행 보고서
//!
//! # 예제
//!
//! ```rust,ignore
//! use hodl_execution::{HodlRunner, RunSettings, StdoutSink};
//!
//! let settings = RunSettings::from(&config);
//! let runner = HodlRunner::new(exchange, Arc::new(StdoutSink), settings);
//! let report = runner.run().await?;
//! ```

pub mod report;
pub mod runner;
pub mod sink;

// 주요 타입 재내보내기
pub use report::{AssetOutcome, BuyOutcome, DepositOutcome, RunReport};
pub use runner::{HodlRunner, RunError, RunSettings};
pub use sink::{RecordingSink, StatusSink, StdoutSink};
