//! 이력 매칭.
//!
//! 윈도우 안의 원장 항목 중 목표 금액과 허용 오차 내에서 일치하는 입금 또는
//! 매수 주문이 있는지 찾습니다. 정렬 순서를 가정하지 않고 전체를 검사합니다.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RecurrenceWindow, Tolerance};
use crate::domain::{summarize_orders, AccountEntry, EntryType, OrderSummary};

/// 매칭 규칙 종류.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKind {
    /// 입금 항목과 금액 비교
    Deposit,
    /// 해당 기준 통화 매수 주문의 지출 금액과 비교
    Buy { base_currency: String },
}

impl MatchKind {
    /// 매수 매칭 규칙을 생성합니다.
    pub fn buy(base_currency: impl Into<String>) -> Self {
        MatchKind::Buy {
            base_currency: base_currency.into().to_uppercase(),
        }
    }
}

/// 일치한 과거 실행의 근거.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchEvidence {
    /// 일치한 입금 항목
    Deposit(AccountEntry),
    /// 일치한 매수 주문 요약
    Buy(OrderSummary),
}

impl std::fmt::Display for MatchEvidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchEvidence::Deposit(entry) => write!(
                f,
                "deposit of {} created at {}{}",
                entry.amount,
                entry.created_at,
                if entry.is_completed() { "" } else { " (pending)" }
            ),
            MatchEvidence::Buy(order) => write!(
                f,
                "order {} spent {} {} on {}",
                order.order_id,
                order.spent(),
                order.quote_currency,
                order.base_currency
            ),
        }
    }
}

/// 윈도우와 허용 오차를 고정한 이력 매처.
#[derive(Debug, Clone, Copy)]
pub struct HistoryMatcher {
    window: RecurrenceWindow,
    tolerance: Tolerance,
}

impl HistoryMatcher {
    pub fn new(window: RecurrenceWindow, tolerance: Tolerance) -> Self {
        Self { window, tolerance }
    }

    pub fn window(&self) -> &RecurrenceWindow {
        &self.window
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// 윈도우 안에서 목표 금액과 일치하는 입금을 찾습니다.
    ///
    /// 완료/취소 상태는 보지 않습니다. 대기 중인 입금도 일치로 간주되어
    /// 처리 중인 입금을 중복 생성하지 않습니다.
    pub fn find_deposit<'a>(
        &self,
        entries: &'a [AccountEntry],
        target: Decimal,
    ) -> Option<&'a AccountEntry> {
        entries.iter().find(|entry| {
            entry.entry_type == EntryType::TransferDeposit
                && self.window.contains(entry.created_at)
                && self.tolerance.matches(entry.amount, target)
        })
    }

    /// 윈도우 안의 매수 주문 중 기준 통화와 지출 금액이 일치하는 주문을 찾습니다.
    pub fn find_buy(
        &self,
        entries: &[AccountEntry],
        base_currency: &str,
        target: Decimal,
    ) -> Option<OrderSummary> {
        self.recent_orders(entries).into_iter().find(|order| {
            order.base_currency.eq_ignore_ascii_case(base_currency)
                && self.tolerance.matches(order.spent(), target)
        })
    }

    /// 윈도우 안의 매수 주문 요약.
    pub fn recent_orders(&self, entries: &[AccountEntry]) -> Vec<OrderSummary> {
        let orders = summarize_orders(
            entries
                .iter()
                .filter(|entry| self.window.contains(entry.created_at)),
        );
        debug!(
            orders = orders.len(),
            window_start = %self.window.start(),
            "Summarized recent buy orders"
        );
        orders
    }

    /// 매칭 규칙에 따라 일치 근거를 찾습니다.
    pub fn find_match(
        &self,
        entries: &[AccountEntry],
        kind: &MatchKind,
        target: Decimal,
    ) -> Option<MatchEvidence> {
        match kind {
            MatchKind::Deposit => self
                .find_deposit(entries, target)
                .cloned()
                .map(MatchEvidence::Deposit),
            MatchKind::Buy { base_currency } => self
                .find_buy(entries, base_currency, target)
                .map(MatchEvidence::Buy),
        }
    }

    /// 일치하는 최근 항목이 있는지 확인합니다.
    pub fn has_recent_match(
        &self,
        entries: &[AccountEntry],
        kind: &MatchKind,
        target: Decimal,
    ) -> bool {
        self.find_match(entries, kind, target).is_some()
    }
}

/// 일치하는 최근 항목이 있는지 확인합니다.
///
/// # Arguments
///
/// * `entries` - 원장 항목 (정렬 불필요)
/// * `kind` - 입금 또는 기준 통화별 매수 규칙
/// * `target` - 목표 금액
/// * `window` - 후행 윈도우
/// * `tolerance` - 허용 오차
pub fn has_recent_match(
    entries: &[AccountEntry],
    kind: &MatchKind,
    target: Decimal,
    window: RecurrenceWindow,
    tolerance: Tolerance,
) -> bool {
    HistoryMatcher::new(window, tolerance).has_recent_match(entries, kind, target)
}
