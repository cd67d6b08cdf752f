//! 二维二值形态学操作.
//!
//! 结构元固定为 3x3 椭圆核. 在 3x3 尺度下, 椭圆核退化为十字形 (中心 + 4-邻域).
//! 越界的邻居一律忽略: 图像边缘的像素不会因边界而被腐蚀, 也不会因边界而被膨胀.

use crate::consts::gray::*;
use crate::{GraySlice, Idx2d};
use ndarray::Array2;

/// 获得 `(h, w)` 的 4-邻居索引. 不检查越界.
///
/// 越界 (负方向) 的分量会回绕为极大值, 进而被 `get` 判为越界.
#[inline]
pub(crate) fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
    ]
}

/// 二值掩膜. 前景为 [`WHITE`], 背景为 [`BLACK`].
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryMask {
    data: Array2<u8>,
}

impl BinaryMask {
    /// 固定阈值二值化: 严格大于 `threshold` 的像素为前景.
    pub fn threshold(img: GraySlice, threshold: u8) -> Self {
        Self {
            data: img
                .data()
                .mapv(|p| if p > threshold { WHITE } else { BLACK }),
        }
    }

    /// 从布尔矩阵构建.
    pub fn from_bools(data: &Array2<bool>) -> Self {
        Self {
            data: data.mapv(|b| if b { WHITE } else { BLACK }),
        }
    }

    /// 以灰度切片视角访问.
    #[inline]
    pub fn as_gray(&self) -> GraySlice<'_> {
        GraySlice::new(self.data.view())
    }

    /// 掩膜的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// `pos` 是否是前景像素. 越界视为背景.
    #[inline]
    pub fn is_set(&self, pos: Idx2d) -> bool {
        self.data.get(pos).copied().is_some_and(is_foreground)
    }

    /// 前景像素总数.
    #[inline]
    pub fn count(&self) -> usize {
        self.as_gray().count(is_foreground)
    }

    /// 腐蚀: 像素保留为前景, 当且仅当它与所有未越界的 4-邻居都是前景.
    pub fn erode(&self) -> Self {
        self.morph(|pos, pix| {
            is_foreground(pix)
                && neighbour4(pos)
                    .into_iter()
                    .filter_map(|n| self.data.get(n).copied())
                    .all(is_foreground)
        })
    }

    /// 膨胀: 像素成为前景, 当且仅当它或任一未越界的 4-邻居是前景.
    pub fn dilate(&self) -> Self {
        self.morph(|pos, pix| {
            is_foreground(pix)
                || neighbour4(pos)
                    .into_iter()
                    .filter_map(|n| self.data.get(n).copied())
                    .any(is_foreground)
        })
    }

    /// 开运算 (先腐蚀后膨胀), 去除细小噪点.
    #[inline]
    pub fn open(&self) -> Self {
        self.erode().dilate()
    }

    /// 闭运算 (先膨胀后腐蚀), 填补细小空隙.
    #[inline]
    pub fn close(&self) -> Self {
        self.dilate().erode()
    }

    fn morph(&self, keep: impl Fn(Idx2d, u8) -> bool) -> Self {
        let mut data = Array2::from_elem(self.data.raw_dim(), BLACK);
        for (pos, &pix) in self.data.indexed_iter() {
            if keep(pos, pix) {
                data[pos] = WHITE;
            }
        }
        Self { data }
    }
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

    #[test]
    fn test_threshold_is_strict() {
        let img = NormalizedImage::new(Array2::from_shape_vec((1, 3), vec![219, 220, 221]).unwrap());
        let m = BinaryMask::threshold(img.as_gray(), 220);
        assert!(!m.is_set((0, 0)));
        assert!(!m.is_set((0, 1)));
        assert!(m.is_set((0, 2)));
        assert!(!m.is_set((5, 5)));
    }

    #[test]
    fn test_open_removes_specks() {
        let m = mask(&[
            ".......", //
            ".#.....", //
            ".......", //
            "...###.", //
            "...###.", //
            "...###.", //
            ".......", //
        ]);
        let opened = m.open();
        assert!(!opened.is_set((1, 1)));
        // 3x3 方块腐蚀为中心一点, 再膨胀为十字.
        assert!(opened.is_set((4, 4)));
        assert!(opened.is_set((3, 4)));
        assert!(!opened.is_set((3, 3)));
        assert_eq!(opened.count(), 5);
    }

    #[test]
    fn test_close_fills_gap() {
        let m = mask(&[
            ".....", //
            ".###.", //
            ".#.#.", //
            ".###.", //
            ".....", //
        ]);
        let closed = m.close();
        assert!(closed.is_set((2, 2)));
        assert!(!closed.is_set((0, 0)));
    }

    #[test]
    fn test_border_is_neutral() {
        // 全前景图像腐蚀后不变 (边界不腐蚀).
        let m = mask(&["###", "###"]);
        assert_eq!(m.erode(), m);
        // 全背景图像膨胀后不变.
        let m = mask(&["...", "..."]);
        assert_eq!(m.dilate(), m);
    }

    #[test]
    fn test_neighbour_out_of_bounds() {
        let n = neighbour4((0, 0));
        assert_eq!(n.iter().filter(|(h, w)| *h < 2 && *w < 2).count(), 2);
        assert_eq!(n[0].0, usize::MAX);
    }
}
