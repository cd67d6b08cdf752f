#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对腹部 CT 水平切片序列进行解剖学评分, 并定位 Y3 标志层
//! (中心呈 "Y" 形突起、两侧不再出现肋骨结构的椎体横断面).
//!
//! 该 crate 只负责评分与跨切片分析本身. 文件解码只提供一层很薄的加载器
//! (`dataset`), 可视化和报告导出不在本 crate 范围内.
//!
//! # 注意
//!
//! 1. 所有评分都是启发式规则, 阈值和权重集中在 [`ScoringConfig`] 中.
//! 2. 单张切片解码失败不会中断整个序列的分析, 只会被记录并跳过.
//!
//! # 开发计划
//!
//! ### 百分位窗口归一化 ✅
//!
//! 以 1% / 99% 百分位作为窗口上下限, 将原始强度映射为 8-bit 灰度图.
//!
//! 实现位于 `y3-berry/src/data/window.rs`.
//!
//! ### 二值形态学与外轮廓提取 ✅
//!
//! 3x3 十字核的腐蚀/膨胀/开/闭运算, 以及 8-邻接前景的外边界跟踪.
//!
//! 实现位于 `y3-berry/src/morph` 和 `y3-berry/src/contour`.
//!
//! ### 四项解剖学子评分 ✅
//!
//! 1. 两侧肋骨计数 (肋骨越少越好);
//! 2. 中心 ROI 的 Y 形评分;
//! 3. 中心 ROI 的椎体质量 (密度 + 均匀度);
//! 4. 切片在序列中的位置.
//!
//! 实现位于 `y3-berry/src/anatomy`.
//!
//! ### 序列分析: 排序、Y3 区间、形成过程质量 ✅
//!
//! 实现位于 `y3-berry/src/analysis`.
//!
//! ### 并行扫描与协作式取消 ✅
//!
//! `rayon` feature 打开时, 扫描阶段按切片并行.

/// 二维索引 `(高, 宽)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 一组像素索引, 如一个连通域或一条轮廓.
type Area2d = Vec<Idx2d>;

pub mod consts;

mod config;
mod error;

pub use config::{
    Band, CompositeWeights, OrdinalBand, OrdinalConfig, PositionConfig, ProgressionConfig,
    RecommendationConfig, Region, RelativeStep, RibConfig, RibScoreStep, ScoringConfig,
    ShapeConfig, TieredBand, VertebraConfig, WindowConfig, ZoneBasis, ZoneConfig,
};
pub use error::{ConfigError, ScanError, SliceError};

mod data;

pub use data::{window, CtWindow, GraySlice, NormalizedImage, OwnedScanSlice, ScanSlice, Slice};

pub mod morph;

pub mod contour;

pub mod anatomy;

pub mod analysis;

pub mod dataset;

pub mod prelude;
