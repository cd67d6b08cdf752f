//! 两侧肋骨计数.
//!
//! 在图像最左、最右两条窄带中寻找 "又白又扁" 的连通域, 每个这样的连通域计为一根肋骨.

use crate::contour::{find_external_contours, Contour};
use crate::morph::BinaryMask;
use crate::{GraySlice, RibConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 两侧肋骨计数结果.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RibReport {
    /// 左侧窄带中的肋骨数.
    pub left: usize,

    /// 右侧窄带中的肋骨数.
    pub right: usize,

    /// 两侧总数.
    pub total: usize,

    /// "无肋骨" 评分, 由 [`RibConfig::score`] 决定.
    pub score: f64,
}

/// 切出左右两条窄带: 列 `[0, w / d)` 和 `[(d - 1) * w / d, w)`, 其中 `d` 为
/// `divisor`. 两条窄带互不重叠, 也不覆盖图像中心.
pub fn lateral_strips(img: GraySlice, divisor: usize) -> (GraySlice, GraySlice) {
    let w = img.width();
    let left_end = w.checked_div(divisor).unwrap_or(0);
    let right_start = (divisor.saturating_sub(1) * w)
        .checked_div(divisor)
        .unwrap_or(w)
        .max(left_end);
    (img.columns(0..left_end), img.columns(right_start..w))
}

/// 判断单个轮廓是否像一根肋骨: 面积适中、明显横向伸展、且几乎饱和的白色.
fn is_rib(contour: &Contour, strip: GraySlice, config: &RibConfig) -> bool {
    if !config.area.contains(contour.area()) {
        return false;
    }
    let rect = contour.bounding_rect();
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    if !config
        .aspect_ratio
        .contains(rect.width as f64 / rect.height as f64)
    {
        return false;
    }
    contour
        .mean_intensity(strip)
        .is_some_and(|mean| mean > config.min_mean_intensity)
}

/// 数出窄带 `strip` 中的肋骨数量. 空窄带没有肋骨.
pub fn count_lateral_bone_structures(strip: GraySlice, config: &RibConfig) -> usize {
    if strip.is_empty() {
        return 0;
    }
    let mask = BinaryMask::threshold(strip, config.threshold).open();
    find_external_contours(&mask)
        .iter()
        .filter(|c| is_rib(c, strip, config))
        .count()
}

/// 统计两侧肋骨并给出 "无肋骨" 评分. 两侧越干净, 评分越高.
pub fn verify_no_lateral_ribs(img: GraySlice, config: &RibConfig) -> RibReport {
    let (left_strip, right_strip) = lateral_strips(img, config.strip_divisor);
    let left = count_lateral_bone_structures(left_strip, config);
    let right = count_lateral_bone_structures(right_strip, config);
    let total = left + right;
    RibReport {
        left,
        right,
        total,
        score: config.score(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NormalizedImage;
    use ndarray::{s, Array2};
    use std::ops::Range;

    const H: usize = 120;
    const W: usize = 240;

    /// 在 `rows × cols` 处画一块值为 `value` 的矩形.
    fn draw(img: &mut Array2<u8>, rows: Range<usize>, cols: Range<usize>, value: u8) {
        img.slice_mut(s![rows, cols]).fill(value);
    }

    #[test]
    fn test_lateral_strips() {
        let img = NormalizedImage::new(Array2::zeros((10, 13)));
        let (l, r) = lateral_strips(img.as_gray(), 6);
        // 13 / 6 = 2, 5 * 13 / 6 = 10.
        assert_eq!(l.width(), 2);
        assert_eq!(r.width(), 3);

        let (l, r) = lateral_strips(img.as_gray(), 0);
        assert!(l.is_empty());
        assert!(r.is_empty());
    }

    #[test]
    fn test_clean_image_has_no_ribs() {
        let img = NormalizedImage::new(Array2::zeros((H, W)));
        let report = verify_no_lateral_ribs(img.as_gray(), &RibConfig::default());
        assert_eq!(report.total, 0);
        assert_eq!(report.score, 100.0);
    }

    #[test]
    fn test_counts_flat_white_bars() {
        let mut data = Array2::zeros((H, W));
        // 左侧两根, 右侧一根: 10 x 38 的横条.
        draw(&mut data, 10..20, 1..39, 255);
        draw(&mut data, 40..50, 1..39, 255);
        draw(&mut data, 70..80, 201..239, 255);
        let img = NormalizedImage::new(data);
        let report = verify_no_lateral_ribs(img.as_gray(), &RibConfig::default());
        assert_eq!(report.left, 2);
        assert_eq!(report.right, 1);
        assert_eq!(report.total, 3);
        assert_eq!(report.score, 40.0);
    }

    #[test]
    fn test_rejects_non_rib_blobs() {
        let mut data = Array2::zeros((H, W));
        // 近似正方形: 宽高比不满足.
        draw(&mut data, 10..30, 5..25, 255);
        // 面积太小.
        draw(&mut data, 40..44, 5..20, 255);
        // 不够亮, 二值化后消失.
        draw(&mut data, 60..70, 1..39, 215);
        // 位于中心的横条不在窄带内.
        draw(&mut data, 90..100, 100..138, 255);
        let img = NormalizedImage::new(data);
        let report = verify_no_lateral_ribs(img.as_gray(), &RibConfig::default());
        assert_eq!(report.total, 0);
    }

    #[test]
    fn test_mean_intensity_gate() {
        let mut data = Array2::zeros((H, 40));
        // 轮廓内部大部分是暗区, 平均灰度不足.
        draw(&mut data, 10..24, 1..39, 255);
        draw(&mut data, 13..21, 4..36, 0);
        let img = NormalizedImage::new(data);
        let config = RibConfig::default();
        assert_eq!(count_lateral_bone_structures(img.as_gray(), &config), 0);

        let relaxed = RibConfig {
            min_mean_intensity: 50.0,
            ..config
        };
        assert_eq!(count_lateral_bone_structures(img.as_gray(), &relaxed), 1);
    }
}
