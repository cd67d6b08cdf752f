//! 单张切片的综合评分.

use crate::anatomy::{
    analyze_central_vertebra, calculate_position_score, detect_central_y_shape,
    verify_no_lateral_ribs, RibReport, ShapeReport, VertebraReport,
};
use crate::consts::MAX_SCORE;
use crate::{GraySlice, ScanSlice, ScoringConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单张切片的分析结果. 生成后不再修改.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SliceAnalysis {
    /// Y 形评分.
    pub y_shape: f64,

    /// "无肋骨" 评分.
    pub no_ribs: f64,

    /// 位置评分.
    pub position: f64,

    /// 椎体质量.
    pub vertebra_quality: f64,

    /// 加权综合评分.
    pub composite: f64,

    /// 肋骨指标 `100 - no_ribs`. 仅用于展示.
    pub ribs_detected: f64,

    /// 两侧肋骨计数细节.
    pub ribs: RibReport,

    /// Y 形评分细节.
    pub shape: ShapeReport,

    /// 椎体质量细节.
    pub vertebra: VertebraReport,
}

/// 单张切片评分器. 只借用配置, 可以在线程间共享.
#[derive(Copy, Clone, Debug)]
pub struct SliceScorer<'a> {
    config: &'a ScoringConfig,
}

impl<'a> SliceScorer<'a> {
    /// 初始化. 调用方负责保证 `config` 已通过 [`ScoringConfig::validate`].
    #[inline]
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// 评分器使用的配置.
    #[inline]
    pub fn config(&self) -> &'a ScoringConfig {
        self.config
    }

    /// 对原始切片 `raw` 做窗口归一化, 再给出全部评分.
    ///
    /// `index` 和 `total` 只用于位置评分: 第 `index` 张, 共 `total` 张.
    pub fn analyze(&self, raw: ScanSlice, index: usize, source_id: &str, total: usize) -> SliceAnalysis {
        let normalized = raw.normalize(&self.config.window);
        let position = calculate_position_score(index, source_id, total, &self.config.position);
        let analysis = self.analyze_normalized(normalized.as_gray(), position);
        log::debug!(
            "切片 #{index} `{source_id}`: 综合 {:.1} (无肋骨 {:.0}, Y 形 {:.0}, 位置 {:.0}, 椎体 {:.1})",
            analysis.composite,
            analysis.no_ribs,
            analysis.y_shape,
            analysis.position,
            analysis.vertebra_quality,
        );
        analysis
    }

    /// 对已归一化的图像评分. 位置评分由调用方给出.
    pub fn analyze_normalized(&self, img: GraySlice, position: f64) -> SliceAnalysis {
        let config = self.config;
        let roi = img.region(&config.central_roi);

        let shape = detect_central_y_shape(roi, &config.shape);
        let ribs = verify_no_lateral_ribs(img, &config.ribs);
        let vertebra = analyze_central_vertebra(roi, &config.vertebra);

        let composite =
            config
                .weights
                .combine(ribs.score, shape.score, position, vertebra.quality);
        SliceAnalysis {
            y_shape: shape.score,
            no_ribs: ribs.score,
            position,
            vertebra_quality: vertebra.quality,
            composite,
            ribs_detected: MAX_SCORE - ribs.score,
            ribs,
            shape,
            vertebra,
        }
    }
}

/// 以给定配置分析单张切片. 见 [`SliceScorer::analyze`].
#[inline]
pub fn analyze_slice(
    raw: ScanSlice,
    index: usize,
    source_id: &str,
    total: usize,
    config: &ScoringConfig,
) -> SliceAnalysis {
    SliceScorer::new(config).analyze(raw, index, source_id, total)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::{s, Array2};

    /// 合成一张 200 x 240 的切片. `ribs` 为两侧肋骨横条的根数 (左右交替),
    /// `vertebra` 为是否在中心 ROI 画出椎体.
    pub(crate) fn synthetic_slice(ribs: usize, vertebra: bool) -> Array2<f32> {
        let mut data = Array2::from_elem((200, 240), 0.0f32);
        // 少量背景纹理, 使百分位窗口不退化.
        data.slice_mut(s![0..4, 100..140]).fill(40.0);
        for k in 0..ribs {
            let top = 8 + (k / 2) * 24;
            let cols = if k % 2 == 0 { 1..39 } else { 201..239 };
            data.slice_mut(s![top..top + 10, cols]).fill(1000.0);
        }
        if vertebra {
            // 中心 ROI 为行 [115, 160), 列 [100, 139).
            data.slice_mut(s![125..145, 112..128]).fill(600.0);
        }
        data
    }

    #[test]
    fn test_composite_weights() {
        let config = ScoringConfig::default();
        let raw = synthetic_slice(0, true);
        let a = analyze_slice(ScanSlice::new(raw.view()), 95, "s.npy", 100, &config);
        assert_eq!(a.no_ribs, 100.0);
        assert_eq!(a.position, 100.0);
        assert_eq!(a.ribs_detected, 0.0);
        let expected = 0.5 * a.no_ribs + 0.3 * a.y_shape + 0.1 * a.position + 0.1 * a.vertebra_quality;
        assert!((a.composite - expected).abs() < 1e-9);
        assert!(a.y_shape > 0.0);
    }

    #[test]
    fn test_ribs_lower_the_score() {
        let config = ScoringConfig::default();
        let clean = analyze_slice(ScanSlice::new(synthetic_slice(0, true).view()), 10, "a", 100, &config);
        let ribbed = analyze_slice(ScanSlice::new(synthetic_slice(5, true).view()), 10, "b", 100, &config);
        assert_eq!(ribbed.ribs.total, 5);
        assert_eq!(ribbed.no_ribs, 20.0);
        assert_eq!(ribbed.ribs_detected, 80.0);
        assert!(ribbed.composite < clean.composite);
    }

    /// 确定性的伪随机噪声 (xorshift), 取值范围 `[lo, hi)`.
    fn noise(shape: (usize, usize), seed: u64, lo: f32, hi: f32) -> Array2<f32> {
        let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
        Array2::from_shape_fn(shape, |_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            lo + (hi - lo) * (state % 10_000) as f32 / 10_000.0
        })
    }

    #[test]
    fn test_scores_stay_within_bounds() {
        let config = ScoringConfig::default();
        assert_eq!(config.weights.combine(100.0, 100.0, 100.0, 100.0), 100.0);
        assert_eq!(config.weights.combine(0.0, 0.0, 0.0, 0.0), 0.0);

        let mut images = vec![
            Array2::<f32>::zeros((0, 0)),
            Array2::from_elem((1, 1), 3.0),
            Array2::from_elem((40, 48), -1000.0),
        ];
        for seed in 0..6 {
            images.push(noise((120, 144), seed, -1000.0, 2000.0));
        }
        for block in [2, 5, 8, 13] {
            images.push(Array2::from_shape_fn((120, 144), |(h, w)| {
                ((h / block + w / block) % 3) as f32 * 500.0
            }));
        }
        for ribs in [0, 1, 3, 6, 9] {
            images.push(synthetic_slice(ribs, ribs % 2 == 0));
        }

        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        for (k, raw) in images.iter().enumerate() {
            for (index, total) in [(0, 1), (k, images.len()), (95, 100)] {
                let a = analyze_slice(ScanSlice::new(raw.view()), index, "s", total, &config);
                for (name, v) in [
                    ("y_shape", a.y_shape),
                    ("no_ribs", a.no_ribs),
                    ("position", a.position),
                    ("vertebra_quality", a.vertebra_quality),
                    ("composite", a.composite),
                    ("ribs_detected", a.ribs_detected),
                ] {
                    assert!(in_range(v), "image #{k}: {name} = {v}");
                }
            }
        }
    }

    #[test]
    fn test_constant_and_empty_slices() {
        let config = ScoringConfig::default();
        let flat = Array2::from_elem((50, 60), 7.0f32);
        let a = analyze_slice(ScanSlice::new(flat.view()), 0, "flat", 1, &config);
        assert_eq!(a.y_shape, 0.0);
        assert_eq!(a.no_ribs, 100.0);
        assert_eq!(a.vertebra_quality, 0.0);

        let empty = Array2::<f32>::zeros((0, 0));
        let a = analyze_slice(ScanSlice::new(empty.view()), 0, "empty", 1, &config);
        assert_eq!(a.y_shape, 0.0);
        assert_eq!(a.vertebra_quality, 0.0);
        assert!((a.composite - 51.0).abs() < 1e-9);
    }
}
