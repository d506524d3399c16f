//! 핵심 에러 타입.
//!
//! 설정 로드와 입력 검증에서 사용되는 에러를 정의합니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum HodlError {
    /// 설정 파일/환경 변수 로드 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type HodlResult<T> = Result<T, HodlError>;

impl From<serde_json::Error> for HodlError {
    fn from(err: serde_json::Error) -> Self {
        HodlError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for HodlError {
    fn from(err: config::ConfigError) -> Self {
        HodlError::Config(err.to_string())
    }
}
