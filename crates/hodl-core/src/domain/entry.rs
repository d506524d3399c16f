//! 계좌 원장 항목.
//!
//! 거래소가 소유하는 읽기 전용 이력 스냅샷입니다. 실행마다 새로 조회되며
//! 이 시스템이 수정하지 않습니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductPair;

/// 원장 항목 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// 연결 계좌로부터의 입금
    TransferDeposit,
    /// 체결
    TradeMatch,
    /// 수수료
    Fee,
    /// 기타 (출금, 리베이트, 전환 등)
    Other,
}

impl EntryType {
    /// 매수 체결 집계 대상(체결 또는 수수료)인지 확인합니다.
    pub fn is_trade_component(&self) -> bool {
        matches!(self, EntryType::TradeMatch | EntryType::Fee)
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::TransferDeposit => write!(f, "deposit"),
            EntryType::TradeMatch => write!(f, "match"),
            EntryType::Fee => write!(f, "fee"),
            EntryType::Other => write!(f, "other"),
        }
    }
}

/// 계좌 원장 항목 하나.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEntry {
    /// 거래소 항목 ID (있는 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 항목 유형
    pub entry_type: EntryType,
    /// 부호 있는 금액 (계좌 통화 단위)
    pub amount: Decimal,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 완료 시각 (대기 중인 입금은 None)
    pub completed_at: Option<DateTime<Utc>>,
    /// 취소 시각
    pub canceled_at: Option<DateTime<Utc>>,
    /// 주문 ID (체결/수수료)
    pub order_id: Option<String>,
    /// 상품 (체결/수수료)
    pub product_pair: Option<ProductPair>,
}

impl AccountEntry {
    /// 지정한 유형의 항목을 생성합니다.
    pub fn new(entry_type: EntryType, amount: Decimal, created_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            entry_type,
            amount,
            created_at,
            completed_at: None,
            canceled_at: None,
            order_id: None,
            product_pair: None,
        }
    }

    /// 입금 항목을 생성합니다.
    pub fn deposit(amount: Decimal, created_at: DateTime<Utc>) -> Self {
        Self::new(EntryType::TransferDeposit, amount, created_at)
    }

    /// 체결 항목을 생성합니다.
    pub fn trade_match(
        order_id: impl Into<String>,
        product: ProductPair,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Some(order_id.into()),
            product_pair: Some(product),
            ..Self::new(EntryType::TradeMatch, amount, created_at)
        }
    }

    /// 수수료 항목을 생성합니다.
    pub fn fee(
        order_id: impl Into<String>,
        product: ProductPair,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Some(order_id.into()),
            product_pair: Some(product),
            ..Self::new(EntryType::Fee, amount, created_at)
        }
    }

    /// 항목 ID를 설정합니다.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 완료 시각을 설정합니다.
    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    /// 취소 시각을 설정합니다.
    pub fn with_canceled_at(mut self, canceled_at: DateTime<Utc>) -> Self {
        self.canceled_at = Some(canceled_at);
        self
    }

    /// 매수로 인한 차감(체결/수수료이면서 음수)인지 확인합니다.
    pub fn is_buy_debit(&self) -> bool {
        self.entry_type.is_trade_component() && self.amount < Decimal::ZERO
    }

    /// 완료 여부.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}
