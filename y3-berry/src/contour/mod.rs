//! 二值掩膜的外轮廓提取与几何度量.
//!
//! 边界跟踪使用 `imageproc` 的 Suzuki-Abe 实现. 只保留没有父轮廓的外边界:
//! 位于孔洞中的连通域不会单独成为轮廓, 而是计入外层轮廓的填充区域.

use crate::consts::gray::{BLACK, WHITE};
use crate::data::PosIter;
use crate::morph::{neighbour4, BinaryMask};
use crate::{Area2d, GraySlice, Idx2d};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::arc_length;
use imageproc::point::Point;
use itertools::{Itertools, MinMaxResult};
use ndarray::Array2;
use std::collections::VecDeque;

/// 轴对齐外接矩形. 宽高按像素个数计 (`max - min + 1`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundingRect {
    /// 最上方的行.
    pub top: usize,
    /// 最左侧的列.
    pub left: usize,
    /// 高.
    pub height: usize,
    /// 宽.
    pub width: usize,
}

/// 一条外轮廓, 以及它包围的全部像素 (轮廓本身 + 内部孔洞).
#[derive(Clone, Debug)]
pub struct Contour {
    points: Area2d,
    filled: Area2d,
}

impl Contour {
    /// 首尾相连的边界像素序列, 首点不重复.
    #[inline]
    pub fn points(&self) -> &[Idx2d] {
        &self.points
    }

    /// 轮廓围住的全部像素, 行优先排列.
    #[inline]
    pub fn filled(&self) -> &[Idx2d] {
        &self.filled
    }

    /// 以边界像素中心为顶点的多边形面积 (鞋带公式).
    ///
    /// 单像素或线状轮廓的面积为 0.
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .points
            .iter()
            .circular_tuple_windows()
            .map(|(&(y1, x1), &(y2, x2))| {
                x1 as f64 * y2 as f64 - x2 as f64 * y1 as f64
            })
            .sum();
        twice.abs() / 2.0
    }

    /// 闭合周长: 相邻边界像素中心距离之和, 包括末点回到首点的一段.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let arc: Vec<Point<f64>> = self
            .points
            .iter()
            .map(|&(h, w)| Point::new(w as f64, h as f64))
            .collect();
        arc_length(&arc, true)
    }

    /// 外接矩形.
    pub fn bounding_rect(&self) -> BoundingRect {
        let span = |r: MinMaxResult<usize>| match r {
            MinMaxResult::NoElements => (0, 0),
            MinMaxResult::OneElement(v) => (v, 1),
            MinMaxResult::MinMax(lo, hi) => (lo, hi - lo + 1),
        };
        let (top, height) = span(self.points.iter().map(|p| p.0).minmax());
        let (left, width) = span(self.points.iter().map(|p| p.1).minmax());
        BoundingRect {
            top,
            left,
            height,
            width,
        }
    }

    /// 轮廓填充区域在 `img` 上的平均灰度. `img` 必须与提取轮廓的掩膜同尺寸.
    #[inline]
    pub fn mean_intensity(&self, img: GraySlice) -> Option<f64> {
        img.mean_at(&self.filled)
    }
}

/// 提取 `mask` 中所有 8-邻接前景连通域的外轮廓, 按各轮廓起点的行优先顺序排列.
pub fn find_external_contours(mask: &BinaryMask) -> Vec<Contour> {
    let (h, w) = mask.shape();
    if h == 0 || w == 0 {
        return Vec::new();
    }
    // 四周补一圈背景, 贴边的前景也能得到完整的外边界.
    let padded = GrayImage::from_fn(w as u32 + 2, h as u32 + 2, |x, y| {
        let pos = ((y as usize).wrapping_sub(1), (x as usize).wrapping_sub(1));
        Luma([if mask.is_set(pos) { WHITE } else { BLACK }])
    });

    find_contours::<usize>(&padded)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            let points: Area2d = c.points.iter().map(|p| (p.y - 1, p.x - 1)).collect();
            let filled = fill_enclosed(&points);
            Contour { points, filled }
        })
        .collect()
}

/// 求外边界 `border` 围住的全部像素 (边界、内部及孔洞).
///
/// 8-邻接的闭合边界挡得住 4-邻接泛洪. 在外接矩形外扩一圈的局部网格上,
/// 从角落出发泛洪填充背景, 没有被泛洪到的格子就是结果.
fn fill_enclosed(border: &[Idx2d]) -> Area2d {
    let (Some(top), Some(bottom)) = (
        border.iter().map(|p| p.0).min(),
        border.iter().map(|p| p.0).max(),
    ) else {
        return Vec::new();
    };
    let (Some(left), Some(right)) = (
        border.iter().map(|p| p.1).min(),
        border.iter().map(|p| p.1).max(),
    ) else {
        return Vec::new();
    };

    // 局部坐标 (r, c) 对应全局坐标 (r + top - 1, c + left - 1).
    let local_shape = (bottom - top + 3, right - left + 3);
    let mut wall = Array2::from_elem(local_shape, false);
    for &(h, w) in border {
        wall[(h - top + 1, w - left + 1)] = true;
    }

    let mut outside = Array2::from_elem(local_shape, false);
    outside[(0, 0)] = true;
    let mut queue = VecDeque::from([(0, 0)]);
    while let Some(cur) = queue.pop_front() {
        for n in neighbour4(cur) {
            if wall.get(n) == Some(&false) && !outside[n] {
                outside[n] = true;
                queue.push_back(n);
            }
        }
    }

    PosIter::within(1..local_shape.0 - 1, 1..local_shape.1 - 1)
        .filter(|&p| !outside[p])
        .map(|(r, c)| (r + top - 1, c + left - 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NormalizedImage;

    fn mask(rows: &[&str]) -> BinaryMask {
        let h = rows.len();
        let w = rows.first().map_or(0, |r| r.len());
        let data = Array2::from_shape_fn((h, w), |(r, c)| rows[r].as_bytes()[c] == b'#');
        BinaryMask::from_bools(&data)
    }

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rectangle_metrics() {
        let data = Array2::from_shape_fn((9, 14), |(h, w)| (2..7).contains(&h) && (2..12).contains(&w));
        let contours = find_external_contours(&BinaryMask::from_bools(&data));
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(float_eq(c.area(), 9.0 * 4.0));
        assert!(float_eq(c.perimeter(), 2.0 * (9.0 + 4.0)));
        assert_eq!(
            c.bounding_rect(),
            BoundingRect {
                top: 2,
                left: 2,
                height: 5,
                width: 10
            }
        );
        assert_eq!(c.filled().len(), 50);
    }

    #[test]
    fn test_component_touching_image_edge() {
        let m = mask(&["####", "####", "####"]);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert!(float_eq(c.area(), 3.0 * 2.0));
        assert!(float_eq(c.perimeter(), 2.0 * (3.0 + 2.0)));
        assert_eq!(c.points().len(), 10);
        assert_eq!(c.filled().len(), 12);
        assert_eq!(
            c.bounding_rect(),
            BoundingRect {
                top: 0,
                left: 0,
                height: 3,
                width: 4
            }
        );
        assert!(find_external_contours(&mask(&[])).is_empty());
    }

    #[test]
    fn test_degenerate_contours() {
        let m = mask(&[
            "#....", //
            ".....", //
            "..###", //
        ]);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 2);

        let dot = &contours[0];
        assert_eq!(dot.points(), &[(0, 0)]);
        assert_eq!(dot.area(), 0.0);
        assert_eq!(dot.perimeter(), 0.0);
        assert_eq!(dot.bounding_rect().width, 1);

        let line = &contours[1];
        assert_eq!(line.area(), 0.0);
        assert!(line.perimeter() > 0.0);
        assert_eq!(line.filled(), &[(2, 2), (2, 3), (2, 4)]);
        assert_eq!(line.bounding_rect().width, 3);
        assert_eq!(line.bounding_rect().height, 1);
    }

    #[test]
    fn test_nested_component_is_not_reported() {
        let m = mask(&[
            "#######", //
            "#.....#", //
            "#..#..#", //
            "#.....#", //
            "#######", //
        ]);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 1);
        // 孔洞与内部连通域全部计入填充区域.
        assert_eq!(contours[0].filled().len(), 35);
        assert!(float_eq(contours[0].area(), 6.0 * 4.0));
    }

    #[test]
    fn test_diagonal_neighbours_merge() {
        let m = mask(&[
            "#...", //
            ".#..", //
            "...#", //
        ]);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].filled().len(), 2);
    }

    #[test]
    fn test_open_ring_is_not_filled() {
        let m = mask(&[
            "#####", //
            "#...#", //
            "#....", //
            "#####", //
        ]);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].filled().len(), 13);
    }

    #[test]
    fn test_mean_intensity_uses_filled_region() {
        let img = NormalizedImage::new(Array2::from_shape_fn((5, 5), |(h, w)| {
            if h == 2 && w == 2 {
                0
            } else {
                250
            }
        }));
        let m = mask(&[
            ".....", //
            ".###.", //
            ".#.#.", //
            ".###.", //
            ".....", //
        ]);
        let contours = find_external_contours(&m);
        assert_eq!(contours.len(), 1);
        let mean = contours[0].mean_intensity(img.as_gray()).unwrap();
        assert!(float_eq(mean, 250.0 * 8.0 / 9.0));
    }
}
