//! 中心 ROI 的 Y 形评分.

use crate::consts::MAX_SCORE;
use crate::contour::{find_external_contours, BoundingRect, Contour};
use crate::morph::BinaryMask;
use crate::{GraySlice, ShapeConfig};
use ordered_float::OrderedFloat;
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 主轮廓的几何特征.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeMetrics {
    /// 面积.
    pub area: f64,

    /// 闭合周长.
    pub perimeter: f64,

    /// 圆度 `4π · area / perimeter²`.
    pub circularity: f64,

    /// 外接矩形高宽比 `height / width`. 宽为 0 时为 0.
    pub aspect_ratio: f64,

    /// 外接矩形左上角 (ROI 内坐标).
    pub top_left: (usize, usize),

    /// 外接矩形尺寸 (高, 宽).
    pub size: (usize, usize),
}

impl ShapeMetrics {
    /// 计算 `contour` 的几何特征. 周长为 0 (单像素轮廓) 时返回 `None`.
    pub fn of(contour: &Contour) -> Option<Self> {
        let perimeter = contour.perimeter();
        if perimeter == 0.0 {
            return None;
        }
        let area = contour.area();
        let BoundingRect {
            top,
            left,
            height,
            width,
        } = contour.bounding_rect();
        let aspect_ratio = if width > 0 {
            height as f64 / width as f64
        } else {
            0.0
        };
        Some(Self {
            area,
            perimeter,
            circularity: 4.0 * PI * area / (perimeter * perimeter),
            aspect_ratio,
            top_left: (top, left),
            size: (height, width),
        })
    }

    /// 按圆度、高宽比和面积三档累加得分, 上限为 `config.max_score`.
    pub fn score(&self, config: &ShapeConfig) -> f64 {
        let total = config.circularity.points(self.circularity)
            + config.aspect_ratio.points(self.aspect_ratio)
            + config.area.points(self.area);
        total.min(config.max_score).min(MAX_SCORE)
    }
}

/// Y 形评分结果. 没有可评估的主轮廓时 `metrics` 为 `None`, 评分为 0.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ShapeReport {
    /// Y 形评分.
    pub score: f64,

    /// 主轮廓的几何特征.
    pub metrics: Option<ShapeMetrics>,
}

/// 面积最大的轮廓. 面积相同时取靠前者.
fn largest(contours: &[Contour]) -> Option<&Contour> {
    // `max_by_key` 在相等时返回最后一个, 反转后即为第一个.
    contours.iter().rev().max_by_key(|c| OrderedFloat(c.area()))
}

/// 对中心 ROI `roi` 做二值化、闭运算、开运算, 然后评估面积最大的外轮廓.
///
/// ROI 为空、没有轮廓或主轮廓面积小于 `config.min_area` 时评分为 0.
pub fn detect_central_y_shape(roi: GraySlice, config: &ShapeConfig) -> ShapeReport {
    if roi.is_empty() {
        return ShapeReport::default();
    }
    let mask = BinaryMask::threshold(roi, config.threshold).close().open();
    let contours = find_external_contours(&mask);
    let Some(main) = largest(&contours) else {
        return ShapeReport::default();
    };
    if main.area() < config.min_area {
        return ShapeReport::default();
    }
    match ShapeMetrics::of(main) {
        Some(metrics) => ShapeReport {
            score: metrics.score(config),
            metrics: Some(metrics),
        },
        None => ShapeReport::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NormalizedImage;
    use ndarray::{s, Array2};

    fn metrics(area: f64, circularity: f64, aspect_ratio: f64) -> ShapeMetrics {
        ShapeMetrics {
            area,
            perimeter: 1.0,
            circularity,
            aspect_ratio,
            top_left: (0, 0),
            size: (1, 1),
        }
    }

    #[test]
    fn test_score_bands() {
        let config = ShapeConfig::default();
        assert_eq!(metrics(500.0, 0.5, 1.2).score(&config), 100.0);
        assert_eq!(metrics(150.0, 0.25, 0.9).score(&config), 50.0);
        assert_eq!(metrics(3000.0, 0.9, 2.0).score(&config), 0.0);
        // 紧区间端点: 圆度和高宽比为闭区间, 面积为开区间.
        assert_eq!(metrics(200.0, 0.3, 1.6).score(&config), 40.0 + 30.0 + 15.0);
        assert_eq!(metrics(100.0, 0.8, 1.8).score(&config), 20.0 + 15.0);
    }

    #[test]
    fn test_rectangle_in_roi() {
        // 20 x 16 的矩形. 开运算削去四角后: 面积 283, 圆度约 0.825, 高宽比 1.25.
        let mut data = Array2::zeros((45, 31));
        data.slice_mut(s![10..30, 8..24]).fill(200);
        let img = NormalizedImage::new(data);
        let report = detect_central_y_shape(img.as_gray(), &ShapeConfig::default());
        let m = report.metrics.unwrap();
        assert_eq!(m.size, (20, 16));
        assert_eq!(m.top_left, (10, 8));
        assert!((m.area - 283.0).abs() < 1e-9);
        assert!((m.aspect_ratio - 1.25).abs() < 1e-9);
        assert!(m.circularity > 0.8 && m.circularity < 0.85);
        assert_eq!(report.score, 60.0);
    }

    #[test]
    fn test_small_or_missing_shape() {
        let config = ShapeConfig::default();

        let img = NormalizedImage::new(Array2::zeros((45, 31)));
        assert_eq!(detect_central_y_shape(img.as_gray(), &config), ShapeReport::default());

        let mut data = Array2::zeros((45, 31));
        data.slice_mut(s![10..16, 8..14]).fill(255);
        let img = NormalizedImage::new(data);
        let report = detect_central_y_shape(img.as_gray(), &config);
        assert_eq!(report.score, 0.0);
        assert!(report.metrics.is_none());

        let empty = NormalizedImage::new(Array2::zeros((0, 5)));
        assert_eq!(detect_central_y_shape(empty.as_gray(), &config).score, 0.0);
    }

    #[test]
    fn test_largest_prefers_first_on_tie() {
        let mut data = Array2::from_elem((3, 7), false);
        data.slice_mut(s![0..2, 0..2]).fill(true);
        data.slice_mut(s![0..2, 4..6]).fill(true);
        let contours = find_external_contours(&BinaryMask::from_bools(&data));
        assert_eq!(contours.len(), 2);
        let main = largest(&contours).unwrap();
        assert_eq!(main.bounding_rect().left, 0);
    }
}
