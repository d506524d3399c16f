//! 정밀한 금액 계산을 위한 Decimal 유틸리티.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 통화 단위 금액 타입 (부호 있음).
pub type Amount = Decimal;

/// 배분 비율 타입 (0.25 = 25%).
pub type Fraction = Decimal;

/// 호가 통화 주문 단위 소수점 자릿수 (0.01).
pub const QUOTE_DECIMALS: u32 = 2;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 지정된 자릿수로 0 방향 절사 후 자릿수를 고정합니다.
    ///
    /// `100` → `100.00`, `33.339` → `33.33`.
    fn quantize_down(&self, dp: u32) -> Decimal;
}

impl DecimalExt for Decimal {
    fn quantize_down(&self, dp: u32) -> Decimal {
        let mut quantized = self.round_dp_with_strategy(dp, RoundingStrategy::ToZero);
        quantized.rescale(dp);
        quantized
    }
}

/// 통화가 포함된 금액 (상태 메시지 표시용).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantize_down() {
        assert_eq!(dec!(33.339).quantize_down(2).to_string(), "33.33");
        assert_eq!(dec!(100).quantize_down(2).to_string(), "100.00");
        assert_eq!(dec!(0.009).quantize_down(2), Decimal::ZERO);
    }

    #[test]
    fn test_money_display() {
        let m = Money::new(dec!(33.33), "usd");
        assert_eq!(m.to_string(), "33.33 USD");
    }
}
