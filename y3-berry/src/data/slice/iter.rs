use crate::Idx2d;
use std::ops::Range;

/// 行优先索引迭代器, 覆盖矩形 `rows × cols`.
#[derive(Debug)]
pub struct PosIter {
    cur_h: usize,
    cur_w: usize,
    rows: Range<usize>,
    cols: Range<usize>,
}

impl PosIter {
    /// 覆盖整张 `(h, w)` 图像.
    #[inline]
    pub fn new((h, w): Idx2d) -> Self {
        Self::within(0..h, 0..w)
    }

    /// 覆盖子矩形 `rows × cols`.
    #[inline]
    pub fn within(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self {
            cur_h: rows.start,
            cur_w: cols.start,
            rows,
            cols,
        }
    }
}

impl Iterator for PosIter {
    type Item = Idx2d;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rows.is_empty() || self.cols.is_empty() || self.cur_h >= self.rows.end {
            return None;
        }
        let ret_pos = (self.cur_h, self.cur_w);
        if self.cur_w + 1 == self.cols.end {
            self.cur_w = self.cols.start;
            self.cur_h += 1;
        } else {
            self.cur_w += 1;
        }
        Some(ret_pos)
    }
}
