use crate::config::{Region, WindowConfig};
use crate::Idx2d;
use ndarray::iter::Iter;
use ndarray::{s, Array2, ArrayView2, Ix2};
use std::ops::{Index, Range};

/// 不可变、借用的二维 8-bit 灰度切片 (归一化图像、二值掩膜或它们的子区域).
#[derive(Copy, Clone, Debug)]
pub struct GraySlice<'a> {
    /// 底层数据的轻量级视图.
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for GraySlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> GraySlice<'a> {
    /// 直接初始化.
    #[inline]
    pub fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView2<'a, u8> {
        self.data
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'a, u8, Ix2> {
        self.data.into_iter()
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 图像的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 图像是否不含任何像素?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// 获得图像的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得图像的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 统计满足 `pred` 的像素个数.
    #[inline]
    pub fn count(&self, mut pred: impl FnMut(u8) -> bool) -> usize {
        self.data.iter().filter(|&&p| pred(p)).count()
    }

    /// 截取行范围 `rows`, 列范围 `cols` 的子图. 范围必须不越界.
    #[inline]
    pub fn crop(&self, rows: Range<usize>, cols: Range<usize>) -> GraySlice<'a> {
        GraySlice::new(self.data.slice_move(s![rows, cols]))
    }

    /// 截取 `region` 描述的子图 (如中心 ROI).
    #[inline]
    pub fn region(&self, region: &Region) -> GraySlice<'a> {
        let (rows, cols) = region.bounds(self.shape());
        self.crop(rows, cols)
    }

    /// 截取列范围 `cols` 的整列子图.
    #[inline]
    pub fn columns(&self, cols: Range<usize>) -> GraySlice<'a> {
        self.crop(0..self.height(), cols)
    }

    /// 求 `positions` 处像素的平均灰度. `positions` 为空时返回 `None`.
    ///
    /// `positions` 不能越界, 否则程序 panic.
    pub fn mean_at(&self, positions: &[Idx2d]) -> Option<f64> {
        if positions.is_empty() {
            return None;
        }
        let sum: u64 = positions.iter().map(|&p| u64::from(self[p])).sum();
        Some(sum as f64 / positions.len() as f64)
    }
}

/// 拥有所有权的 8-bit 归一化灰度图像. 生命周期限于一次切片分析.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedImage {
    data: Array2<u8>,
}

impl NormalizedImage {
    /// 直接初始化.
    #[inline]
    pub fn new(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// 获得不可变切片引用.
    #[inline]
    pub fn as_gray(&self) -> GraySlice<'_> {
        GraySlice::new(self.data.view())
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }
}

/// 不可变、借用的二维原始 CT 扫描切片 (未经窗口处理的强度值).
#[derive(Copy, Clone, Debug)]
pub struct ScanSlice<'a> {
    /// 底层数据的轻量级视图.
    data: ArrayView2<'a, f32>,
}

impl Index<Idx2d> for ScanSlice<'_> {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> ScanSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub fn new(data: ArrayView2<'a, f32>) -> Self {
        Self { data }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView2<'a, f32> {
        self.data
    }

    /// 以百分位窗口归一化为 8-bit 图像. 见 [`crate::window::normalize`].
    #[inline]
    pub fn normalize(&self, config: &WindowConfig) -> NormalizedImage {
        crate::window::normalize(self.data, config)
    }
}

/// 拥有所有权的二维原始 CT 扫描切片.
///
/// `OwnedScanSlice` 仅提供到 `ScanSlice` 的轻量转换和底层数据移动,
/// 不提供任何其它方法.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedScanSlice {
    data: Array2<f32>,
}

impl OwnedScanSlice {
    /// 直接初始化.
    #[inline]
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immutable(&self) -> ScanSlice<'_> {
        ScanSlice::new(self.data.view())
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }
}
