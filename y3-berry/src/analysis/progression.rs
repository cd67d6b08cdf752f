//! Y3 区间内评分的形成过程质量.
//!
//! 按切片索引排序后, 评分越是单调递增、波动越小, 说明 Y3 形成过程越清晰.

use super::Candidate;
use crate::ProgressionConfig;
use itertools::Itertools;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 形成过程质量的文字评价.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Verdict {
    /// 质量 >= 80.
    Excellent,
    /// 质量 >= 60.
    Good,
    /// 质量 >= 40.
    Moderate,
    /// 其它.
    Limited,
}

impl Verdict {
    /// 由质量百分比得到评价.
    pub fn of(quality: f64, config: &ProgressionConfig) -> Self {
        if quality >= config.excellent {
            Verdict::Excellent
        } else if quality >= config.good {
            Verdict::Good
        } else if quality >= config.moderate {
            Verdict::Moderate
        } else {
            Verdict::Limited
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Excellent => "EXCELLENT PROGRESSION",
            Verdict::Good => "GOOD PROGRESSION",
            Verdict::Moderate => "MODERATE PROGRESSION",
            Verdict::Limited => "LIMITED PROGRESSION",
        };
        f.write_str(s)
    }
}

/// 形成过程质量.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Progression {
    /// 质量百分比.
    pub quality: f64,

    /// 文字评价.
    pub verdict: Verdict,
}

impl Progression {
    /// 评估按切片索引升序排列的评分序列 `scores`.
    pub fn evaluate(scores: &[f64], config: &ProgressionConfig) -> Self {
        let quality = progression_quality(scores, config);
        Self {
            quality,
            verdict: Verdict::of(quality, config),
        }
    }
}

/// 求形成过程质量 (百分比).
///
/// 少于两个评分时为 0; 恰好两个时为固定值 `config.pair_quality`; 否则为
/// `(递增比例 * trend_weight + 稳定度 * stability_weight) * 100`,
/// 其中递增比例为相邻评分严格递增的对数占比, 稳定度为
/// `max(0, 1 - 总体方差 / variance_scale)`.
pub fn progression_quality(scores: &[f64], config: &ProgressionConfig) -> f64 {
    match scores.len() {
        0 | 1 => 0.0,
        2 => config.pair_quality,
        n => {
            let increases = scores
                .iter()
                .tuple_windows()
                .filter(|(a, b)| b > a)
                .count();
            let ratio = increases as f64 / (n - 1) as f64;

            let mean = scores.iter().sum::<f64>() / n as f64;
            let var = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n as f64;
            let stability = (1.0 - var / config.variance_scale).max(0.0);

            (ratio * config.trend_weight + stability * config.stability_weight) * 100.0
        }
    }
}

/// Y3 形成过程的三个阶段: 区间内第一张、中间一张和最后一张候选切片.
#[derive(Copy, Clone, Debug)]
pub struct FormationStages<'a> {
    /// 形成早期.
    pub early: &'a Candidate,

    /// 形成中期. 候选不超过两张时没有中期.
    pub middle: Option<&'a Candidate>,

    /// 最终形成 (最优位置).
    pub optimal: &'a Candidate,
}

impl<'a> FormationStages<'a> {
    /// 从按索引升序排列的候选中取出三个阶段. 候选为空时返回 `None`.
    pub fn from_sorted(candidates: &'a [Candidate]) -> Option<Self> {
        let early = candidates.first()?;
        let optimal = candidates.last()?;
        let middle = (candidates.len() > 2).then(|| &candidates[candidates.len() / 2]);
        Some(Self {
            early,
            middle,
            optimal,
        })
    }
}
