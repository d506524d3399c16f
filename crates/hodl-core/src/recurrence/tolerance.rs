//! 금액 근사 일치 허용 오차.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{HodlError, HodlResult};

/// 기본 허용 오차 (0.10 통화 단위).
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.10);

/// 과거 금액과 목표 금액을 "같은 실행"으로 볼 최대 차이.
///
/// 주문 시점의 0.01 단위 절사를 흡수합니다. 0이면 정확히 일치해야 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Tolerance(Decimal);

impl Tolerance {
    /// 허용 오차를 생성합니다. 음수는 거부됩니다.
    pub fn new(value: Decimal) -> HodlResult<Self> {
        if value < Decimal::ZERO {
            return Err(HodlError::InvalidInput(format!(
                "tolerance must be non-negative, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// 정확 일치 (허용 오차 0).
    pub fn exact() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `|actual - target| <= tolerance`
    pub fn matches(&self, actual: Decimal, target: Decimal) -> bool {
        (actual - target).abs() <= self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(DEFAULT_TOLERANCE)
    }
}

impl TryFrom<Decimal> for Tolerance {
    type Error = HodlError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tolerance> for Decimal {
    fn from(tolerance: Tolerance) -> Self {
        tolerance.0
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
