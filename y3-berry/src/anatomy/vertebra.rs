//! 中心 ROI 的椎体质量: 致密像素占比 + 致密像素的灰度均匀度.
//!
//! 质量只在上方截断. 当致密像素的标准差超过均匀度基准值时, 均匀度为负,
//! 致密像素又很少的话质量本身也可能为负; 这种情况原样保留.

use crate::{GraySlice, VertebraConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 椎体质量评估结果.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VertebraReport {
    /// 致密像素占 ROI 的比例.
    pub density_ratio: f64,

    /// `uniformity_base - std(致密像素)`. 没有致密像素时为 0.
    pub uniformity: f64,

    /// 质量评分.
    pub quality: f64,
}

/// 评估中心 ROI `roi` 的椎体质量. ROI 为空时各项均为 0.
pub fn analyze_central_vertebra(roi: GraySlice, config: &VertebraConfig) -> VertebraReport {
    if roi.is_empty() {
        return VertebraReport::default();
    }
    let dense: Vec<f64> = roi
        .iter()
        .filter(|&&p| p > config.dense_threshold)
        .map(|&p| f64::from(p))
        .collect();
    let density_ratio = dense.len() as f64 / roi.size() as f64;
    let uniformity = population_std(&dense).map_or(0.0, |std| config.uniformity_base - std);
    let quality = (density_ratio * config.density_weight + uniformity * config.uniformity_weight)
        .min(config.max_quality);
    VertebraReport {
        density_ratio,
        uniformity,
        quality,
    }
}

/// 总体标准差 (除以 `n`). 空序列返回 `None`.
fn population_std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NormalizedImage;
    use ndarray::{s, Array2};

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_uniform_dense_roi() {
        let img = NormalizedImage::new(Array2::from_elem((10, 10), 200));
        let r = analyze_central_vertebra(img.as_gray(), &VertebraConfig::default());
        assert!(float_eq(r.density_ratio, 1.0));
        assert!(float_eq(r.uniformity, 100.0));
        assert!(float_eq(r.quality, 100.0));
    }

    #[test]
    fn test_half_dense_roi() {
        let mut data = Array2::zeros((10, 10));
        data.slice_mut(s![0..5, ..]).fill(200);
        let img = NormalizedImage::new(data);
        let r = analyze_central_vertebra(img.as_gray(), &VertebraConfig::default());
        assert!(float_eq(r.density_ratio, 0.5));
        assert!(float_eq(r.quality, 25.0 + 50.0));
    }

    #[test]
    fn test_threshold_is_strict_and_empty_cases() {
        let config = VertebraConfig::default();
        let img = NormalizedImage::new(Array2::from_elem((4, 4), 120));
        let r = analyze_central_vertebra(img.as_gray(), &config);
        assert_eq!(r, VertebraReport::default());

        let empty = NormalizedImage::new(Array2::zeros((0, 0)));
        assert_eq!(analyze_central_vertebra(empty.as_gray(), &config).quality, 0.0);
    }

    #[test]
    fn test_quality_can_be_negative() {
        // 阈值为 0 时, 两个致密像素 1 和 255 的标准差为 127, 均匀度为负.
        let config = VertebraConfig {
            dense_threshold: 0,
            ..VertebraConfig::default()
        };
        let mut data = Array2::zeros((10, 10));
        data[(0, 0)] = 1;
        data[(9, 9)] = 255;
        let img = NormalizedImage::new(data);
        let r = analyze_central_vertebra(img.as_gray(), &config);
        assert!(float_eq(r.uniformity, -27.0));
        assert!(float_eq(r.quality, 0.02 * 50.0 - 13.5));
        assert!(r.quality < 0.0);
    }

    #[test]
    fn test_population_std() {
        assert_eq!(population_std(&[]), None);
        assert!(float_eq(population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap(), 2.0));
    }
}
