//! 실행 보고서.

use hodl_core::{DepositRequest, MarketBuyRequest, MatchEvidence};
use hodl_exchange::{DepositReceipt, OrderReceipt};
use rust_decimal::Decimal;
use serde::Serialize;

/// 입금 단계 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DepositOutcome {
    /// 입금액 0 (단계 비활성화)
    Disabled,
    /// 입금 요청됨
    Deposited(DepositReceipt),
    /// 이번 주기에 이미 입금됨
    AlreadyDone(MatchEvidence),
    /// 드라이런: 실행했을 요청
    DryRun(DepositRequest),
    /// 이력 조회 또는 입금 실패
    Failed(String),
}

impl DepositOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DepositOutcome::Failed(_))
    }
}

/// 자산 하나의 매수 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BuyOutcome {
    /// 주문 접수됨
    Bought(OrderReceipt),
    /// 이번 주기에 이미 매수됨
    AlreadyBought(MatchEvidence),
    /// 가용 잔고가 임계값 미만
    InsufficientBalance { available: Decimal, required: Decimal },
    /// 절사 후 금액이 0 (호가 단위 미만)
    BelowIncrement,
    /// 드라이런: 실행했을 요청
    DryRun(MarketBuyRequest),
    /// 주문 실패
    Failed(String),
}

/// 자산별 매수 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetOutcome {
    /// 기준 통화
    pub currency: String,
    /// 목표 지출 금액 (절사 전)
    pub target: Decimal,
    /// 결과
    pub outcome: BuyOutcome,
}

/// 한 번의 실행 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// 입금 단계 결과
    pub deposit: DepositOutcome,
    /// 자산별 매수 결과 (통화 코드 순)
    pub buys: Vec<AssetOutcome>,
    /// 매수 단계 전체가 실패한 경우의 사유 (이력 조회 실패 등)
    pub buy_phase_error: Option<String>,
    /// 드라이런 여부
    pub dry_run: bool,
}

impl RunReport {
    /// 실패한 단계 또는 주문이 있는지 확인합니다.
    pub fn has_failures(&self) -> bool {
        self.deposit.is_failed()
            || self.buy_phase_error.is_some()
            || self
                .buys
                .iter()
                .any(|b| matches!(b.outcome, BuyOutcome::Failed(_)))
    }

    /// 접수된 매수 주문 수.
    pub fn orders_placed(&self) -> usize {
        self.buys
            .iter()
            .filter(|b| matches!(b.outcome, BuyOutcome::Bought(_)))
            .count()
    }

    /// 특정 자산의 결과.
    pub fn buy_for(&self, currency: &str) -> Option<&BuyOutcome> {
        self.buys
            .iter()
            .find(|b| b.currency.eq_ignore_ascii_case(currency))
            .map(|b| &b.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn report(outcome: BuyOutcome) -> RunReport {
        RunReport {
            deposit: DepositOutcome::Disabled,
            buys: vec![AssetOutcome {
                currency: "BTC".to_string(),
                target: dec!(50),
                outcome,
            }],
            buy_phase_error: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_has_failures() {
        assert!(!report(BuyOutcome::BelowIncrement).has_failures());
        assert!(!report(BuyOutcome::InsufficientBalance {
            available: dec!(1),
            required: dec!(50),
        })
        .has_failures());
        assert!(report(BuyOutcome::Failed("boom".into())).has_failures());

        let mut r = report(BuyOutcome::BelowIncrement);
        r.buy_phase_error = Some("history unavailable".into());
        assert!(r.has_failures());
    }

    #[test]
    fn test_buy_for() {
        let r = report(BuyOutcome::BelowIncrement);
        assert_eq!(r.buy_for("btc"), Some(&BuyOutcome::BelowIncrement));
        assert_eq!(r.buy_for("ETH"), None);
        assert_eq!(r.orders_placed(), 0);
    }
}
