//! 评分配置.
//!
//! 所有阈值、分段和权重都集中在 [`ScoringConfig`] 中, 评分代码本身只读取配置,
//! 不出现魔法数字. [`ScoringConfig::default`] 给出经验默认值.

use crate::error::ConfigError;
use crate::Idx2d;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一维数值区间. `inclusive` 为 `true` 时为闭区间, 否则为开区间.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Band {
    /// 下限.
    pub lo: f64,

    /// 上限.
    pub hi: f64,

    /// 是否包含端点.
    pub inclusive: bool,
}

impl Band {
    /// 闭区间 `[lo, hi]`.
    #[inline]
    pub const fn closed(lo: f64, hi: f64) -> Self {
        Self {
            lo,
            hi,
            inclusive: true,
        }
    }

    /// 开区间 `(lo, hi)`.
    #[inline]
    pub const fn open(lo: f64, hi: f64) -> Self {
        Self {
            lo,
            hi,
            inclusive: false,
        }
    }

    /// `v` 是否落在区间内. NaN 永远不在区间内.
    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        if self.inclusive {
            self.lo <= v && v <= self.hi
        } else {
            self.lo < v && v < self.hi
        }
    }
}

/// 两档区间: 落在紧区间得 `tight_points`, 落在宽区间 (但不在紧区间) 得
/// `loose_points`, 否则得 0.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TieredBand {
    /// 紧区间.
    pub tight: Band,

    /// 宽区间.
    pub loose: Band,

    /// 紧区间得分.
    pub tight_points: f64,

    /// 宽区间得分.
    pub loose_points: f64,
}

impl TieredBand {
    /// 求 `v` 的得分.
    #[inline]
    pub fn points(&self, v: f64) -> f64 {
        if self.tight.contains(v) {
            self.tight_points
        } else if self.loose.contains(v) {
            self.loose_points
        } else {
            0.0
        }
    }
}

/// 以图像高/宽比例描述的矩形区域: 行 `[top * h, bottom * h)`,
/// 列 `[left * w, right * w)`. 比例乘积向零取整.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    /// 起始行比例.
    pub top: f64,

    /// 结束行比例 (不含).
    pub bottom: f64,

    /// 起始列比例.
    pub left: f64,

    /// 结束列比例 (不含).
    pub right: f64,
}

impl Region {
    /// 腰椎椎体所在的中心 ROI: 行 `[0.58h, 0.80h)`, 列 `[0.42w, 0.58w)`.
    #[inline]
    pub const fn central_vertebra() -> Self {
        Self {
            top: 0.58,
            bottom: 0.80,
            left: 0.42,
            right: 0.58,
        }
    }

    /// 求 `(h, w)` 图像上该区域的行范围和列范围. 保证范围不越界且不反向.
    pub fn bounds(&self, (h, w): Idx2d) -> (Range<usize>, Range<usize>) {
        #[inline]
        fn span(len: usize, start: f64, end: f64) -> Range<usize> {
            // `as usize` 对负数和 NaN 饱和到 0.
            let a = ((len as f64 * start) as usize).min(len);
            let b = ((len as f64 * end) as usize).min(len);
            a..b.max(a)
        }
        (span(h, self.top, self.bottom), span(w, self.left, self.right))
    }
}

/// 百分位窗口设置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WindowConfig {
    /// 窗口下限百分位.
    pub low_percentile: f64,

    /// 窗口上限百分位.
    pub high_percentile: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            low_percentile: 1.0,
            high_percentile: 99.0,
        }
    }
}

/// 肋骨计数到评分的一级阶梯: 肋骨数 `<= max_ribs` 时得 `score`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RibScoreStep {
    /// 本级允许的最大肋骨数.
    pub max_ribs: usize,

    /// 本级得分.
    pub score: f64,
}

/// 两侧肋骨检测设置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RibConfig {
    /// 两侧区域宽度为图像宽度的 `1 / strip_divisor`.
    pub strip_divisor: usize,

    /// 二值化阈值 (严格大于才是前景).
    pub threshold: u8,

    /// 肋骨轮廓面积区间 (平方像素).
    pub area: Band,

    /// 肋骨外接矩形宽高比 (宽 / 高) 区间.
    pub aspect_ratio: Band,

    /// 轮廓内部平均灰度必须严格大于该值.
    pub min_mean_intensity: f64,

    /// 按 `max_ribs` 升序排列的评分阶梯.
    pub steps: Vec<RibScoreStep>,

    /// 超出所有阶梯时的得分.
    pub otherwise: f64,
}

impl RibConfig {
    /// 将两侧肋骨总数映射为 "无肋骨" 评分 (非增阶梯函数).
    pub fn score(&self, total_ribs: usize) -> f64 {
        self.steps
            .iter()
            .find(|s| total_ribs <= s.max_ribs)
            .map_or(self.otherwise, |s| s.score)
    }
}

impl Default for RibConfig {
    fn default() -> Self {
        Self {
            strip_divisor: 6,
            threshold: 220,
            area: Band::open(300.0, 3000.0),
            aspect_ratio: Band::open(2.0, 10.0),
            min_mean_intensity: 200.0,
            steps: vec![
                RibScoreStep {
                    max_ribs: 0,
                    score: 100.0,
                },
                RibScoreStep {
                    max_ribs: 2,
                    score: 70.0,
                },
                RibScoreStep {
                    max_ribs: 4,
                    score: 40.0,
                },
                RibScoreStep {
                    max_ribs: 6,
                    score: 20.0,
                },
            ],
            otherwise: 0.0,
        }
    }
}

/// 中心 Y 形评分设置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeConfig {
    /// 二值化阈值 (严格大于才是前景).
    pub threshold: u8,

    /// 最大轮廓面积小于该值时直接判 0 分.
    pub min_area: f64,

    /// 圆度 `4π·面积 / 周长²` 分段.
    pub circularity: TieredBand,

    /// 外接矩形高宽比 (高 / 宽) 分段.
    pub aspect_ratio: TieredBand,

    /// 轮廓面积分段.
    pub area: TieredBand,

    /// 总分上限.
    pub max_score: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            threshold: 140,
            min_area: 50.0,
            circularity: TieredBand {
                tight: Band::closed(0.3, 0.7),
                loose: Band::closed(0.2, 0.8),
                tight_points: 40.0,
                loose_points: 20.0,
            },
            aspect_ratio: TieredBand {
                tight: Band::closed(1.0, 1.6),
                loose: Band::closed(0.8, 1.8),
                tight_points: 30.0,
                loose_points: 15.0,
            },
            area: TieredBand {
                tight: Band::open(200.0, 1500.0),
                loose: Band::open(100.0, 2000.0),
                tight_points: 30.0,
                loose_points: 15.0,
            },
            max_score: 100.0,
        }
    }
}

/// 椎体质量评分设置.
///
/// `quality = density_ratio * density_weight
///     + (uniformity_base - std) * uniformity_weight`, 仅上限截断.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertebraConfig {
    /// 致密像素阈值 (严格大于).
    pub dense_threshold: u8,

    /// 致密比例权重.
    pub density_weight: f64,

    /// 均匀度基准值.
    pub uniformity_base: f64,

    /// 均匀度权重.
    pub uniformity_weight: f64,

    /// 质量上限.
    pub max_quality: f64,
}

impl Default for VertebraConfig {
    fn default() -> Self {
        Self {
            dense_threshold: 120,
            density_weight: 50.0,
            uniformity_base: 100.0,
            uniformity_weight: 0.5,
            max_quality: 100.0,
        }
    }
}

/// 相对位置评分的一级阶梯: `index / total >= min_ratio` 时得 `score`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RelativeStep {
    /// 相对位置下限.
    pub min_ratio: f64,

    /// 本级得分.
    pub score: f64,
}

/// 文件名序号评分的一个闭区间 `[first, last]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OrdinalBand {
    /// 区间起点.
    pub first: i64,

    /// 区间终点 (含).
    pub last: i64,

    /// 本区间得分.
    pub score: f64,
}

/// 文件名序号 (如 `0193_xxx.dcm` 中的 `193`) 评分设置.
///
/// 这是针对一种已知命名方式的历史特例, 默认关闭.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OrdinalConfig {
    /// 序号与文件名其余部分的分隔符.
    pub separator: char,

    /// 按顺序匹配的序号区间.
    pub bands: Vec<OrdinalBand>,

    /// 序号不在任何区间内时的得分.
    pub otherwise: f64,
}

impl Default for OrdinalConfig {
    fn default() -> Self {
        Self {
            separator: '_',
            bands: vec![
                OrdinalBand {
                    first: 190,
                    last: 199,
                    score: 100.0,
                },
                OrdinalBand {
                    first: 185,
                    last: 189,
                    score: 50.0,
                },
            ],
            otherwise: 10.0,
        }
    }
}

/// 位置评分设置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PositionConfig {
    /// 按 `min_ratio` 降序排列的相对位置阶梯.
    pub relative: Vec<RelativeStep>,

    /// 低于所有阶梯时的得分.
    pub relative_otherwise: f64,

    /// 文件名序号覆盖策略. `None` 表示只用相对位置.
    pub ordinal: Option<OrdinalConfig>,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            relative: vec![
                RelativeStep {
                    min_ratio: 0.85,
                    score: 100.0,
                },
                RelativeStep {
                    min_ratio: 0.75,
                    score: 50.0,
                },
            ],
            relative_otherwise: 10.0,
            ordinal: None,
        }
    }
}

/// 综合评分权重.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CompositeWeights {
    /// "无肋骨" 权重. 肋骨缺失是最主要的判别依据.
    pub no_ribs: f64,

    /// Y 形权重.
    pub y_shape: f64,

    /// 位置权重.
    pub position: f64,

    /// 椎体质量权重.
    pub vertebra: f64,
}

impl CompositeWeights {
    /// 加权求和.
    #[inline]
    pub fn combine(&self, no_ribs: f64, y_shape: f64, position: f64, vertebra: f64) -> f64 {
        no_ribs * self.no_ribs
            + y_shape * self.y_shape
            + position * self.position
            + vertebra * self.vertebra
    }
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            no_ribs: 0.5,
            y_shape: 0.3,
            position: 0.1,
            vertebra: 0.1,
        }
    }
}

/// Y3 区间的计数基准.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ZoneBasis {
    /// 以成功分析的切片数为基准. 区间由成功分析切片的序数决定.
    #[default]
    Analyzed,

    /// 以序列 (目录) 中切片总数为基准. 区间直接由切片索引决定,
    /// 尾部切片全部解码失败时区间可能为空.
    Requested,
}

/// Y3 区间设置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ZoneConfig {
    /// 区间起点为 `floor(start_fraction * N)`.
    pub start_fraction: f64,

    /// `N` 的计数基准.
    pub basis: ZoneBasis,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            start_fraction: 0.85,
            basis: ZoneBasis::Analyzed,
        }
    }
}

/// 形成过程质量设置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProgressionConfig {
    /// 递增比例权重.
    pub trend_weight: f64,

    /// 稳定度权重.
    pub stability_weight: f64,

    /// 稳定度 `max(0, 1 - var / variance_scale)` 中的归一化尺度.
    pub variance_scale: f64,

    /// 区间内恰好两个候选时的固定质量.
    pub pair_quality: f64,

    /// "excellent" 下限.
    pub excellent: f64,

    /// "good" 下限.
    pub good: f64,

    /// "moderate" 下限.
    pub moderate: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            trend_weight: 0.7,
            stability_weight: 0.3,
            variance_scale: 1000.0,
            pair_quality: 50.0,
            excellent: 80.0,
            good: 60.0,
            moderate: 40.0,
        }
    }
}

/// 最终推荐与质量指示设置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RecommendationConfig {
    /// 综合评分不低于该值时推荐等级为 excellent.
    pub excellent: f64,

    /// 综合评分不低于该值时推荐等级为 good.
    pub good: f64,

    /// 综合评分高于该值时判定为 Y3.
    pub confirmed: f64,

    /// 综合评分高于该值时判定为可能是 Y3.
    pub possible: f64,

    /// Y 形评分高于该值视为 Y 形清晰.
    pub y_shape_visible: f64,

    /// "无肋骨" 评分高于该值视为无肋骨干扰.
    pub rib_free: f64,

    /// 位置评分高于该值视为位置良好.
    pub good_position: f64,

    /// 肋骨指标低于该值视为 Y3 形成干净.
    pub clean_formation: f64,

    /// 椎体质量高于该值视为椎体质量优秀.
    pub optimal_vertebra: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            excellent: 70.0,
            good: 55.0,
            confirmed: 60.0,
            possible: 40.0,
            y_shape_visible: 60.0,
            rib_free: 70.0,
            good_position: 70.0,
            clean_formation: 15.0,
            optimal_vertebra: 70.0,
        }
    }
}

/// 全部评分配置.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringConfig {
    /// 百分位窗口.
    pub window: WindowConfig,

    /// 两侧肋骨检测.
    pub ribs: RibConfig,

    /// Y 形评分和椎体质量共用的中心 ROI.
    pub central_roi: Region,

    /// Y 形评分.
    pub shape: ShapeConfig,

    /// 椎体质量.
    pub vertebra: VertebraConfig,

    /// 位置评分.
    pub position: PositionConfig,

    /// 综合评分权重.
    pub weights: CompositeWeights,

    /// Y3 区间.
    pub zone: ZoneConfig,

    /// 形成过程质量.
    pub progression: ProgressionConfig,

    /// 推荐与质量指示.
    pub recommendation: RecommendationConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            ribs: RibConfig::default(),
            central_roi: Region::central_vertebra(),
            shape: ShapeConfig::default(),
            vertebra: VertebraConfig::default(),
            position: PositionConfig::default(),
            weights: CompositeWeights::default(),
            zone: ZoneConfig::default(),
            progression: ProgressionConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }
}

impl ScoringConfig {
    /// 检查明显不合理的配置.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let WindowConfig {
            low_percentile: low,
            high_percentile: high,
        } = self.window;
        if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low > high {
            return Err(ConfigError::Percentiles { low, high });
        }

        if self.ribs.strip_divisor == 0 {
            return Err(ConfigError::ZeroStripDivisor);
        }

        let r = &self.central_roi;
        for (name, value) in [
            ("central_roi.top", r.top),
            ("central_roi.bottom", r.bottom),
            ("central_roi.left", r.left),
            ("central_roi.right", r.right),
            ("zone.start_fraction", self.zone.start_fraction),
        ] {
            fraction(name, value)?;
        }
        ordered("central_roi.rows", r.top, r.bottom)?;
        ordered("central_roi.cols", r.left, r.right)?;

        let w = &self.weights;
        let p = &self.progression;
        for (name, value) in [
            ("weights.no_ribs", w.no_ribs),
            ("weights.y_shape", w.y_shape),
            ("weights.position", w.position),
            ("weights.vertebra", w.vertebra),
            ("progression.trend_weight", p.trend_weight),
            ("progression.stability_weight", p.stability_weight),
            ("progression.variance_scale", p.variance_scale),
        ] {
            non_negative(name, value)?;
        }
        Ok(())
    }
}

#[inline]
fn fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Fraction { name, value })
    }
}

#[inline]
fn ordered(name: &'static str, start: f64, end: f64) -> Result<(), ConfigError> {
    if start <= end {
        Ok(())
    } else {
        Err(ConfigError::Range { name, start, end })
    }
}

#[inline]
fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}
