//! 주문 요약 및 주문/입금 요청 타입.
//!
//! - `OrderSummary` - 같은 주문 ID를 공유하는 체결/수수료 항목의 합계
//! - `MarketBuyRequest` - 호가 통화 금액 기준 시장가 매수 요청
//! - `DepositRequest` - 연결 계좌 입금 요청

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::domain::AccountEntry;
use crate::types::{DecimalExt, ProductPair, QUOTE_DECIMALS};

/// 주문 하나에 속한 체결/수수료 항목의 집계.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// 주문 ID
    pub order_id: String,
    /// 기준 통화 (매수 자산)
    pub base_currency: String,
    /// 호가 통화 (법정화폐)
    pub quote_currency: String,
    /// 구성 항목 금액의 합 (매수는 음수)
    pub total_amount: Decimal,
}

impl OrderSummary {
    /// 실제 지출 금액 (`-total_amount`).
    pub fn spent(&self) -> Decimal {
        -self.total_amount
    }
}

/// 매수 차감 항목을 주문 ID별로 묶어 요약합니다.
///
/// 체결/수수료가 아니거나 양수인 항목, 주문 ID 또는 상품 정보가 없는 항목은
/// 무시됩니다. 결과는 각 주문이 처음 나타난 순서를 따릅니다.
pub fn summarize_orders<'a, I>(entries: I) -> Vec<OrderSummary>
where
    I: IntoIterator<Item = &'a AccountEntry>,
{
    let mut summaries: Vec<OrderSummary> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries.into_iter().filter(|e| e.is_buy_debit()) {
        let (Some(order_id), Some(pair)) = (&entry.order_id, &entry.product_pair) else {
            debug!(entry_id = ?entry.id, "Skipping trade entry without order id or product");
            continue;
        };

        match index.get(order_id) {
            Some(&i) => summaries[i].total_amount += entry.amount,
            None => {
                index.insert(order_id.clone(), summaries.len());
                summaries.push(OrderSummary {
                    order_id: order_id.clone(),
                    base_currency: pair.base.clone(),
                    quote_currency: pair.quote.clone(),
                    total_amount: entry.amount,
                });
            }
        }
    }

    summaries
}

/// 시장가 매수 요청 (호가 통화 금액 지정).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketBuyRequest {
    /// 상품
    pub product: ProductPair,
    /// 지출할 호가 통화 금액 (0.01 단위로 절사됨)
    pub funds: Decimal,
    /// 클라이언트 주문 ID
    pub client_oid: Uuid,
}

impl MarketBuyRequest {
    /// 새 매수 요청을 생성합니다. 금액은 호가 단위로 절사됩니다.
    pub fn new(product: ProductPair, funds: Decimal) -> Self {
        Self {
            product,
            funds: funds.quantize_down(QUOTE_DECIMALS),
            client_oid: Uuid::new_v4(),
        }
    }
}

/// 결제 수단으로부터의 입금 요청.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    /// 입금액 (0.01 단위로 절사됨)
    pub amount: Decimal,
    /// 통화
    pub currency: String,
    /// 결제 수단 ID
    pub payment_method_id: String,
}

impl DepositRequest {
    /// 새 입금 요청을 생성합니다.
    pub fn new(
        amount: Decimal,
        currency: impl Into<String>,
        payment_method_id: impl Into<String>,
    ) -> Self {
        Self {
            amount: amount.quantize_down(QUOTE_DECIMALS),
            currency: currency.into().to_uppercase(),
            payment_method_id: payment_method_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summarize_orders_sums_fees() {
        let now = Utc::now();
        let btc = ProductPair::new("BTC", "USD");
        let eth = ProductPair::new("ETH", "USD");

        let entries = vec![
            AccountEntry::trade_match("o1", btc.clone(), dec!(-49.97), now),
            AccountEntry::trade_match("o2", eth.clone(), dec!(-30), now),
            AccountEntry::fee("o1", btc, dec!(-0.03), now),
            AccountEntry::fee("o2", eth, dec!(-0.10), now),
            AccountEntry::deposit(dec!(100), now),
        ];

        let summaries = summarize_orders(&entries);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].order_id, "o1");
        assert_eq!(summaries[0].base_currency, "BTC");
        assert_eq!(summaries[0].total_amount, dec!(-50.00));
        assert_eq!(summaries[0].spent(), dec!(50.00));
        assert_eq!(summaries[1].total_amount, dec!(-30.10));
    }

    #[test]
    fn test_summarize_skips_incomplete_entries() {
        let now = Utc::now();
        let mut orphan = AccountEntry::trade_match("o1", ProductPair::new("BTC", "USD"), dec!(-5), now);
        orphan.order_id = None;

        assert!(summarize_orders(&[orphan]).is_empty());
    }

    #[test]
    fn test_requests_quantize_down() {
        let buy = MarketBuyRequest::new(ProductPair::new("BTC", "USD"), dec!(33.3333));
        assert_eq!(buy.funds.to_string(), "33.33");

        let deposit = DepositRequest::new(dec!(100), "usd", "pm-1");
        assert_eq!(deposit.amount.to_string(), "100.00");
        assert_eq!(deposit.currency, "USD");
    }
}
