//! 실행 여부 결정 (입금 게이트, 매수 게이트).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{HistoryMatcher, MatchEvidence, MatchKind, RecurrenceWindow, Tolerance};
use crate::domain::{AccountEntry, AllocationPlan};

/// 게이트 하나의 결정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// 이번 주기에 아직 실행하지 않음
    Act,
    /// 이미 실행함 (근거 포함)
    AlreadyDone(MatchEvidence),
}

impl Decision {
    pub fn is_act(&self) -> bool {
        matches!(self, Decision::Act)
    }

    pub fn evidence(&self) -> Option<&MatchEvidence> {
        match self {
            Decision::Act => None,
            Decision::AlreadyDone(evidence) => Some(evidence),
        }
    }
}

/// 매수 게이트 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuyGate {
    /// 자산별로 판단 (해당 자산 매수만 차단)
    #[default]
    PerAsset,
    /// 계획된 자산 중 하나라도 매수 이력이 있으면 전체 차단
    Aggregate,
}

impl FromStr for BuyGate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "per-asset" | "asset" => Ok(BuyGate::PerAsset),
            "aggregate" | "all" => Ok(BuyGate::Aggregate),
            _ => Err(format!("Unknown buy gate: {} (expected per-asset or aggregate)", s)),
        }
    }
}

impl std::fmt::Display for BuyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuyGate::PerAsset => write!(f, "per-asset"),
            BuyGate::Aggregate => write!(f, "aggregate"),
        }
    }
}

/// 자산 하나의 매수 결정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyDecision {
    /// 기준 통화
    pub currency: String,
    /// 목표 지출 금액 (절사 전)
    pub target: Decimal,
    /// 결정
    pub decision: Decision,
}

/// 실행 여부를 결정합니다: 일치하는 최근 항목이 없을 때만 `true`.
///
/// # Arguments
///
/// * `history` - 원장 항목
/// * `kind` - 입금 또는 기준 통화별 매수 규칙
/// * `target` - 목표 금액
/// * `window` - 후행 윈도우
/// * `tolerance` - 허용 오차
pub fn should_act(
    history: &[AccountEntry],
    kind: &MatchKind,
    target: Decimal,
    window: RecurrenceWindow,
    tolerance: Tolerance,
) -> bool {
    !HistoryMatcher::new(window, tolerance).has_recent_match(history, kind, target)
}

/// 반복 실행 결정기.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceDecision {
    matcher: HistoryMatcher,
}

impl RecurrenceDecision {
    pub fn new(window: RecurrenceWindow, tolerance: Tolerance) -> Self {
        Self {
            matcher: HistoryMatcher::new(window, tolerance),
        }
    }

    pub fn matcher(&self) -> &HistoryMatcher {
        &self.matcher
    }

    /// 일반 게이트 결정.
    pub fn decide(&self, history: &[AccountEntry], kind: &MatchKind, target: Decimal) -> Decision {
        match self.matcher.find_match(history, kind, target) {
            Some(evidence) => Decision::AlreadyDone(evidence),
            None => Decision::Act,
        }
    }

    /// 입금 게이트.
    pub fn deposit(&self, transfers: &[AccountEntry], target: Decimal) -> Decision {
        self.decide(transfers, &MatchKind::Deposit, target)
    }

    /// 계획된 자산별 매수 게이트.
    ///
    /// `BuyGate::Aggregate`에서는 한 자산이라도 이미 매수되었으면 모든 자산이
    /// 같은 근거로 차단됩니다.
    pub fn buys(
        &self,
        history: &[AccountEntry],
        plan: &AllocationPlan,
        gate: BuyGate,
    ) -> Vec<BuyDecision> {
        let mut decisions: Vec<BuyDecision> = plan
            .iter()
            .map(|(currency, target)| BuyDecision {
                currency: currency.to_string(),
                target,
                decision: self.decide(history, &MatchKind::buy(currency), target),
            })
            .collect();

        if gate == BuyGate::Aggregate {
            let blocking = decisions
                .iter()
                .find_map(|d| d.decision.evidence().cloned());
            if let Some(evidence) = blocking {
                for d in &mut decisions {
                    d.decision = Decision::AlreadyDone(evidence.clone());
                }
            }
        }

        decisions
    }
}
