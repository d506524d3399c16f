//! 자산 배분 계산.
//!
//! 총액과 통화별 비율로부터 통화별 목표 매수 금액을 계산합니다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Amount, Fraction};

/// 통화별 배분 비율.
///
/// 통화 코드는 대문자로 정규화되며 같은 통화를 다시 넣으면 나중 값이 이깁니다.
/// 비율 합이 1을 넘거나 범위를 벗어나도 거부하지 않습니다 (설정 책임은 호출자).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationWeights(BTreeMap<String, Fraction>);

impl AllocationWeights {
    /// 빈 배분을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 통화 비율을 추가합니다.
    pub fn insert(&mut self, currency: impl Into<String>, fraction: Fraction) {
        self.0.insert(currency.into().to_uppercase(), fraction);
    }

    /// 빌더 형태로 통화 비율을 추가합니다.
    pub fn with(mut self, currency: impl Into<String>, fraction: Fraction) -> Self {
        self.insert(currency, fraction);
        self
    }

    /// 비율 합계.
    pub fn total_fraction(&self) -> Fraction {
        self.0.values().copied().sum()
    }

    /// 통화 코드 순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Fraction)> {
        self.0.iter().map(|(c, f)| (c.as_str(), *f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Fraction)> for AllocationWeights {
    fn from_iter<T: IntoIterator<Item = (S, Fraction)>>(iter: T) -> Self {
        let mut weights = Self::new();
        for (currency, fraction) in iter {
            weights.insert(currency, fraction);
        }
        weights
    }
}

/// 통화별 목표 매수 금액 (법정화폐 단위).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan(BTreeMap<String, Amount>);

impl AllocationPlan {
    /// 통화의 목표 금액.
    pub fn get(&self, currency: &str) -> Option<Amount> {
        self.0.get(&currency.to_uppercase()).copied()
    }

    /// 계획된 금액의 합계.
    pub fn total(&self) -> Amount {
        self.0.values().copied().sum()
    }

    /// 통화 코드 순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.0.iter().map(|(c, a)| (c.as_str(), *a))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 배분 계획 계산.
///
/// 각 `(통화, 비율)` 쌍에 대해 `total_amount * 비율`을 그대로 계산합니다.
/// 반올림은 하지 않으며 (호가 단위 절사는 주문 시점에 수행),
/// 비율 합이 1보다 작으면 나머지는 법정화폐로 남습니다.
///
/// # Arguments
///
/// * `total_amount` - 배분할 총액 (0 이상)
/// * `weights` - 통화별 비율
///
/// # Examples
///
/// ```
/// use hodl_core::{compute_allocation, AllocationWeights};
/// use rust_decimal_macros::dec;
///
/// let weights = AllocationWeights::new().with("BTC", dec!(0.6)).with("ETH", dec!(0.3));
/// let plan = compute_allocation(dec!(100), &weights);
/// assert_eq!(plan.get("BTC"), Some(dec!(60.0)));
/// assert_eq!(plan.total(), dec!(90.0));
/// ```
pub fn compute_allocation(total_amount: Amount, weights: &AllocationWeights) -> AllocationPlan {
    AllocationPlan(
        weights
            .0
            .iter()
            .map(|(currency, fraction)| (currency.clone(), total_amount * *fraction))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_compute_allocation() {
        let weights: AllocationWeights = vec![
            ("ltc", dec!(0.10)),
            ("ETH", dec!(0.60)),
            ("BTC", dec!(0.30)),
        ]
        .into_iter()
        .collect();

        let plan = compute_allocation(dec!(95.00), &weights);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.get("LTC"), Some(dec!(9.5)));
        assert_eq!(plan.get("eth"), Some(dec!(57)));
        assert_eq!(plan.get("BTC"), Some(dec!(28.5)));
        assert_eq!(plan.total(), dec!(95.00));
    }

    #[test]
    fn test_remainder_stays_unallocated() {
        let weights = AllocationWeights::new().with("BTC", dec!(0.25));
        let plan = compute_allocation(dec!(100), &weights);
        assert_eq!(plan.total(), dec!(25));
    }

    #[test]
    fn test_out_of_range_weights_accepted() {
        let weights = AllocationWeights::new()
            .with("BTC", dec!(0.8))
            .with("ETH", dec!(0.5));
        assert_eq!(weights.total_fraction(), dec!(1.3));

        let plan = compute_allocation(dec!(100), &weights);
        assert_eq!(plan.total(), dec!(130));
    }

    #[test]
    fn test_duplicate_currency_last_wins() {
        let weights: AllocationWeights =
            vec![("BTC", dec!(0.5)), ("btc", dec!(0.2))].into_iter().collect();
        assert_eq!(weights.len(), 1);
        assert_eq!(compute_allocation(dec!(10), &weights).get("BTC"), Some(dec!(2)));
    }

    proptest! {
        #[test]
        fn prop_allocation_never_exceeds_total(
            total_cents in 0i64..10_000_000,
            raw in proptest::collection::vec(0i64..=10_000, 1..6),
        ) {
            let total = Decimal::new(total_cents, 2);
            // 베이시스 포인트 단위로 합이 10000 이하가 되도록 축소
            let sum: i64 = raw.iter().sum();
            let weights: AllocationWeights = raw
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let bps = if sum > 10_000 { w * 10_000 / sum } else { *w };
                    (format!("C{}", i), Decimal::new(bps, 4))
                })
                .collect();
            prop_assert!(weights.total_fraction() <= Decimal::ONE);

            let plan = compute_allocation(total, &weights);

            prop_assert!(plan.total() <= total);
            for (currency, fraction) in weights.iter() {
                prop_assert_eq!(plan.get(currency), Some(total * fraction));
                prop_assert!(plan.get(currency).unwrap_or_default() >= Decimal::ZERO);
            }
        }
    }
}
