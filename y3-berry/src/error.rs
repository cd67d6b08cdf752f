//! 运行时错误.
//!
//! 注意 "ROI 为空", "窗口退化", "序列为空" 和 "找不到 Y3 区间" 都不是错误,
//! 它们分别以评分 0, 全零图像, [`crate::analysis::ZoneOutcome::NoData`]
//! 和 [`crate::analysis::ZoneOutcome::NotFound`] 表示.

use crate::Idx2d;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单张切片无法参与分析的原因.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SliceError {
    /// 切片文件无法解码.
    #[error("无法解码切片 `{source_id}`: {reason}")]
    Decode {
        /// 切片来源标识 (一般是文件名).
        source_id: String,

        /// 底层解码器给出的原因.
        reason: String,
    },

    /// 切片形状与序列中第一张可用切片不一致.
    #[error("切片 `{source_id}` 形状为 {found:?}, 与序列形状 {expected:?} 不一致")]
    ShapeMismatch {
        /// 切片来源标识.
        source_id: String,

        /// 序列形状 (高, 宽).
        expected: Idx2d,

        /// 该切片的形状 (高, 宽).
        found: Idx2d,
    },
}

impl SliceError {
    /// 出错切片的来源标识.
    pub fn source_id(&self) -> &str {
        match self {
            SliceError::Decode { source_id, .. } | SliceError::ShapeMismatch { source_id, .. } => {
                source_id
            }
        }
    }
}

/// 评分配置不合法.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 百分位数对不合法. 需要 `0 <= low <= high <= 100`.
    #[error("百分位数对不合法: low = {low}, high = {high}")]
    Percentiles {
        /// 低百分位.
        low: f64,
        /// 高百分位.
        high: f64,
    },

    /// 比例值超出 `[0, 1]`.
    #[error("`{name}` 必须位于 [0, 1], 实际为 {value}")]
    Fraction {
        /// 配置项名.
        name: &'static str,
        /// 实际值.
        value: f64,
    },

    /// 区间起点大于终点.
    #[error("`{name}` 的起点 {start} 大于终点 {end}")]
    Range {
        /// 配置项名.
        name: &'static str,
        /// 起点.
        start: f64,
        /// 终点.
        end: f64,
    },

    /// 权重或系数为负数 (或不是有限值).
    #[error("`{name}` 必须是非负有限值, 实际为 {value}")]
    Negative {
        /// 配置项名.
        name: &'static str,
        /// 实际值.
        value: f64,
    },

    /// 两侧肋骨区域的分母为 0.
    #[error("两侧区域宽度的分母不能为 0")]
    ZeroStripDivisor,
}

/// 序列扫描错误.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// 扫描被调用方取消.
    #[error("扫描在分析 {analyzed}/{requested} 张切片后被取消")]
    Cancelled {
        /// 取消前已分析完成的切片数.
        analyzed: usize,
        /// 序列中切片总数.
        requested: usize,
    },

    /// 评分配置不合法.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
