//! CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 명령줄 인자 정의 및 설정 덮어쓰기
//! - 배분 비율 인자 파싱
//! - 거래소와 실행기 연결
//! - 실행 요약 출력

pub mod commands;

pub use commands::*;
