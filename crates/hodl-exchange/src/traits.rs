//! 거래소 trait 정의.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hodl_core::{AccountEntry, DepositRequest, MarketBuyRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 연결된 결제 수단 (은행 계좌 등).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// 결제 수단 ID
    pub id: String,
    /// 표시 이름 (예: "Checking ******1234")
    pub name: String,
    /// 유형 (예: "ach_bank_account")
    pub method_type: String,
    /// 통화 (예: "USD")
    pub currency: String,
}

impl PaymentMethod {
    /// 유형이 같고 이름에 `name_filter`가 포함되는지 확인합니다.
    ///
    /// 빈 필터는 모든 이름과 일치합니다.
    pub fn matches(&self, method_type: &str, name_filter: &str) -> bool {
        self.method_type == method_type && self.name.contains(name_filter)
    }
}

/// 거래소 계좌 (통화별).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// 계좌 ID
    pub id: String,
    /// 통화
    pub currency: String,
    /// 총 잔고
    pub balance: Decimal,
    /// 사용 가능한 잔고
    pub available: Decimal,
    /// 주문/출금에 묶인 잔고
    pub hold: Decimal,
}

/// 시장가 매수 접수 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// 거래소 주문 ID
    pub order_id: String,
    /// 상품 ID (예: "BTC-USD")
    pub product_id: String,
    /// 지정한 지출 금액
    pub funds: Decimal,
    /// 주문 상태 (예: "pending")
    pub status: String,
}

/// 입금 접수 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// 입금 ID
    pub id: String,
    /// 입금액
    pub amount: Decimal,
    /// 통화
    pub currency: String,
    /// 입금 예정 시각
    pub payout_at: Option<DateTime<Utc>>,
}

/// 정기 입금/매수에 필요한 거래소 작업.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// 거래소 이름 반환.
    fn name(&self) -> &str;

    // === 계좌 작업 ===

    /// 연결된 결제 수단 목록.
    async fn list_payment_methods(&self) -> ExchangeResult<Vec<PaymentMethod>>;

    /// 통화별 계좌 목록.
    async fn list_accounts(&self) -> ExchangeResult<Vec<Account>>;

    /// 계좌 원장 조회 (최신순).
    ///
    /// `since`가 주어지면 그보다 오래된 페이지는 더 요청하지 않습니다.
    /// 경계 페이지의 오래된 항목이 섞여 있을 수 있으므로 호출자가 윈도우로
    /// 다시 거릅니다.
    async fn get_account_history(
        &self,
        account_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<AccountEntry>>;

    /// 계좌 이체(입금) 내역 조회 (최신순).
    async fn get_transfers(
        &self,
        account_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> ExchangeResult<Vec<AccountEntry>>;

    // === 주문/입금 작업 ===

    /// 지출 금액 기준 시장가 매수.
    async fn place_market_buy(&self, request: &MarketBuyRequest) -> ExchangeResult<OrderReceipt>;

    /// 결제 수단에서 입금.
    async fn deposit(&self, request: &DepositRequest) -> ExchangeResult<DepositReceipt>;
}
