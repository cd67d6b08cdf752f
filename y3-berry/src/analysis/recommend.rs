//! 推荐切片的最终建议与质量指示.

use super::slice::SliceAnalysis;
use super::stack::{StackReport, ZoneOutcome};
use crate::RecommendationConfig;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 推荐等级.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tier {
    /// 可以放心使用.
    Excellent,
    /// 可以使用, 建议人工确认.
    Good,
    /// 需要人工复核.
    Moderate,
}

impl Tier {
    /// 由综合评分得到推荐等级.
    pub fn of(score: f64, config: &RecommendationConfig) -> Self {
        if score >= config.excellent {
            Tier::Excellent
        } else if score >= config.good {
            Tier::Good
        } else {
            Tier::Moderate
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Excellent => "EXCELLENT - Proceed with confidence",
            Tier::Good => "GOOD - Consider manual verification",
            Tier::Moderate => "MODERATE - Manual review advised",
        };
        f.write_str(s)
    }
}

/// 单张切片综合评分的解读.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Interpretation {
    /// 是 Y3.
    Confirmed,
    /// 可能是 Y3.
    Possible,
    /// 不是 Y3.
    NotLandmark,
}

impl Interpretation {
    /// 综合评分严格高于 `confirmed` 为 Y3, 严格高于 `possible` 为可能.
    pub fn of(score: f64, config: &RecommendationConfig) -> Self {
        if score > config.confirmed {
            Interpretation::Confirmed
        } else if score > config.possible {
            Interpretation::Possible
        } else {
            Interpretation::NotLandmark
        }
    }
}

/// 推荐切片的质量指示.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct QualityIndicators {
    /// Y 形清晰.
    pub y_shape_visible: bool,

    /// 两侧无肋骨干扰.
    pub rib_free: bool,

    /// 位置良好.
    pub good_position: bool,

    /// Y3 形成干净 (肋骨指标低).
    pub clean_formation: bool,

    /// 椎体质量优秀.
    pub optimal_vertebra: bool,
}

impl QualityIndicators {
    /// 由单张切片的分析结果得到质量指示. 所有比较均为严格比较.
    pub fn of(analysis: &SliceAnalysis, config: &RecommendationConfig) -> Self {
        Self {
            y_shape_visible: analysis.y_shape > config.y_shape_visible,
            rib_free: analysis.no_ribs > config.rib_free,
            good_position: analysis.position > config.good_position,
            clean_formation: analysis.ribs_detected < config.clean_formation,
            optimal_vertebra: analysis.vertebra_quality > config.optimal_vertebra,
        }
    }
}

/// 针对推荐切片的最终建议.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    /// 推荐切片的索引.
    pub index: usize,

    /// 推荐切片的来源标识.
    pub source_id: String,

    /// 置信度, 即推荐切片的综合评分.
    pub confidence: f64,

    /// 推荐等级.
    pub tier: Tier,

    /// 综合评分解读.
    pub interpretation: Interpretation,

    /// 质量指示.
    pub indicators: QualityIndicators,

    /// 区间内有效切片占比 (百分比). 没有区间时为 `None`.
    pub coverage: Option<f64>,

    /// 区间内除推荐切片外的其它有效切片数.
    pub alternatives: usize,

    /// 是否需要人工复核: 没有找到区间, 或推荐等级为 [`Tier::Moderate`].
    pub manual_review: bool,
}

/// 切片相对于分析报告的状态.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SliceStatus {
    /// 推荐切片.
    Best,
    /// Y3 区间内成功分析的候选.
    ZoneCandidate,
    /// 位于 Y3 区间索引范围内, 但不是候选 (如解码失败被跳过).
    InZone,
    /// 其它.
    Outside,
}

pub(super) fn slice_status(report: &StackReport, index: usize) -> SliceStatus {
    if report.best().is_some_and(|b| b.index == index) {
        return SliceStatus::Best;
    }
    match report.zone() {
        Some(zone) if zone.candidates.iter().any(|c| c.index == index) => {
            SliceStatus::ZoneCandidate
        }
        Some(zone) if zone.contains(index) => SliceStatus::InZone,
        _ => SliceStatus::Outside,
    }
}

pub(super) fn recommend(report: &StackReport, config: &RecommendationConfig) -> Option<Recommendation> {
    let best = report.best()?;
    let tier = Tier::of(best.score, config);
    let (coverage, alternatives) = match &report.outcome {
        ZoneOutcome::Found(zone) => (Some(zone.coverage()), zone.candidates.len().saturating_sub(1)),
        _ => (None, 0),
    };
    Some(Recommendation {
        index: best.index,
        source_id: best.source_id.clone(),
        confidence: best.score,
        tier,
        interpretation: Interpretation::of(best.score, config),
        indicators: QualityIndicators::of(&best.analysis, config),
        coverage,
        alternatives,
        manual_review: report.needs_manual_review() || tier == Tier::Moderate,
    })
}
