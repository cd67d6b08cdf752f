//! 切片数据结构.

pub mod slice;
pub mod window;

pub(crate) use slice::PosIter;
pub use slice::{GraySlice, NormalizedImage, OwnedScanSlice, ScanSlice};
pub use window::CtWindow;

use crate::Idx2d;
use ndarray::Array2;

/// 有序切片序列中的一张切片: 来源标识 + 原始强度矩阵.
///
/// 切片在序列中的位置即为其索引, 因此该结构本身不保存索引.
/// 来源标识 (一般是文件名) 只用于排序和位置启发式, 不参与图像计算.
#[derive(Clone, Debug, PartialEq)]
pub struct Slice {
    source_id: String,
    scan: OwnedScanSlice,
}

impl Slice {
    /// 初始化.
    pub fn new(source_id: impl Into<String>, data: Array2<f32>) -> Self {
        Self {
            source_id: source_id.into(),
            scan: OwnedScanSlice::new(data),
        }
    }

    /// 来源标识.
    #[inline]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// 原始扫描数据.
    #[inline]
    pub fn scan(&self) -> ScanSlice<'_> {
        self.scan.as_immutable()
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.scan.shape()
    }
}
