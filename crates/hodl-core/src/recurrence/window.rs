//! 후행 반복 주기 윈도우.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// `[now - interval, now)` 후행 윈도우.
///
/// 하한만 항목을 제외합니다. `now` 이후로 찍힌 항목(거래소 시계가 앞선 경우,
/// 방금 생성된 항목)은 윈도우 안으로 취급됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceWindow {
    start: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl RecurrenceWindow {
    /// `now`에서 `interval`만큼 거슬러 올라가는 윈도우를 생성합니다.
    ///
    /// 하한이 표현 범위를 벗어나면 `DateTime::<Utc>::MIN_UTC`로 고정됩니다.
    pub fn trailing(now: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            start: now
                .checked_sub_signed(interval)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            now,
        }
    }

    /// 일 단위 간격으로 윈도우를 생성합니다.
    pub fn days(now: DateTime<Utc>, days: u32) -> Self {
        Self::trailing(now, Duration::days(i64::from(days)))
    }

    /// 윈도우 하한 (포함).
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// 기준 시각.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// 윈도우 길이.
    pub fn interval(&self) -> Duration {
        self.now - self.start
    }

    /// 시각이 윈도우 안에 있는지 확인합니다.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start
    }
}

impl std::fmt::Display for RecurrenceWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "last {} days", self.interval().num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();
        let window = RecurrenceWindow::days(now, 15);

        assert!(window.contains(now));
        assert!(window.contains(now - Duration::days(15)));
        assert!(window.contains(now - Duration::days(14)));
        assert!(!window.contains(now - Duration::days(15) - Duration::seconds(1)));
        assert!(!window.contains(now - Duration::days(20)));
        // 거래소 시계가 앞선 경우
        assert!(window.contains(now + Duration::seconds(5)));
    }

    #[test]
    fn test_window_display() {
        let window = RecurrenceWindow::days(Utc::now(), 15);
        assert_eq!(window.to_string(), "last 15 days");
        assert_eq!(window.interval(), Duration::days(15));
    }

    #[test]
    fn test_huge_interval_clamps_start() {
        let now = Utc::now();
        let window = RecurrenceWindow::days(now, u32::MAX);

        assert_eq!(window.start(), DateTime::<Utc>::MIN_UTC);
        assert!(window.contains(now - Duration::days(36_500)));
    }
}
