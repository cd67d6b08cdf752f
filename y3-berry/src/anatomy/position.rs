//! 位置评分. Y3 一般位于序列尾部.
//!
//! 两种策略实现同一个 [`PositionStrategy`] 接口:
//!
//! 1. [`RelativePosition`]: 切片索引占序列长度的比例. 这是默认且唯一总能给出结果的策略.
//! 2. [`FilenameOrdinal`]: 解析来源标识开头的扫描序号. 只适用于一种已知命名方式,
//!    需要在 [`PositionConfig::ordinal`] 中显式打开.

use crate::{OrdinalConfig, PositionConfig, RelativeStep};

/// 位置评分策略.
pub trait PositionStrategy {
    /// 为序列中第 `index` 张 (共 `total` 张) 切片评分. 策略不适用时返回 `None`.
    fn score(&self, index: usize, source_id: &str, total: usize) -> Option<f64>;
}

/// 按相对位置 `index / total` 评分.
#[derive(Copy, Clone, Debug)]
pub struct RelativePosition<'a> {
    steps: &'a [RelativeStep],
    otherwise: f64,
}

impl<'a> RelativePosition<'a> {
    /// 由配置构建.
    pub fn new(config: &'a PositionConfig) -> Self {
        Self {
            steps: &config.relative,
            otherwise: config.relative_otherwise,
        }
    }
}

impl PositionStrategy for RelativePosition<'_> {
    fn score(&self, index: usize, _source_id: &str, total: usize) -> Option<f64> {
        if total == 0 {
            return Some(self.otherwise);
        }
        let ratio = index as f64 / total as f64;
        Some(
            self.steps
                .iter()
                .find(|s| ratio >= s.min_ratio)
                .map_or(self.otherwise, |s| s.score),
        )
    }
}

/// 按来源标识开头的扫描序号评分, 如 `0193_ct.dcm` 中的 `193`.
#[derive(Copy, Clone, Debug)]
pub struct FilenameOrdinal<'a> {
    config: &'a OrdinalConfig,
}

impl<'a> FilenameOrdinal<'a> {
    /// 由配置构建.
    pub fn new(config: &'a OrdinalConfig) -> Self {
        Self { config }
    }

    /// 解析分隔符之前的序号. 没有分隔符或无法解析时返回 `None`.
    pub fn ordinal(&self, source_id: &str) -> Option<i64> {
        let (head, _) = source_id.split_once(self.config.separator)?;
        head.trim().parse().ok()
    }
}

impl PositionStrategy for FilenameOrdinal<'_> {
    fn score(&self, _index: usize, source_id: &str, _total: usize) -> Option<f64> {
        let ordinal = self.ordinal(source_id)?;
        Some(
            self.config
                .bands
                .iter()
                .find(|b| (b.first..=b.last).contains(&ordinal))
                .map_or(self.config.otherwise, |b| b.score),
        )
    }
}

/// 位置评分: 若打开了序号策略且来源标识可解析, 使用序号策略; 否则使用相对位置.
pub fn calculate_position_score(
    index: usize,
    source_id: &str,
    total: usize,
    config: &PositionConfig,
) -> f64 {
    let relative = RelativePosition::new(config);
    config
        .ordinal
        .as_ref()
        .and_then(|ordinal| FilenameOrdinal::new(ordinal).score(index, source_id, total))
        .or_else(|| relative.score(index, source_id, total))
        .unwrap_or(config.relative_otherwise)
}
