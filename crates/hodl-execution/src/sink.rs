//! 상태 메시지 출력.
//!
//! 실행기는 진행 상황을 사람이 읽는 한 줄 메시지로 sink에 보냅니다.
//! 진단 로그(`tracing`)는 stderr로, 상태 메시지는 stdout으로 분리됩니다.

use chrono::Local;
use std::io::Write;
use std::sync::Mutex;

/// 상태 메시지 수신자.
pub trait StatusSink: Send + Sync {
    /// 상태 메시지 한 줄을 내보냅니다.
    fn emit(&self, message: &str);

    /// sink 이름을 반환합니다.
    fn name(&self) -> &str;
}

/// 타임스탬프를 붙여 stdout에 출력하는 sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl StatusSink for StdoutSink {
    fn emit(&self, message: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        // 파이프가 닫힌 경우 등은 무시
        let _ = writeln!(
            handle,
            "{}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

/// 메시지를 메모리에 보관하는 sink (테스트용).
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 받은 메시지.
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// `needle`을 포함하는 메시지가 있는지 확인합니다.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, message: &str) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.emit("Depositing 100.00 USD");
        sink.emit("Buying 50.00 USD of BTC");

        assert_eq!(sink.messages().len(), 2);
        assert!(sink.contains("of BTC"));
        assert!(!sink.contains("ETH"));
    }
}
