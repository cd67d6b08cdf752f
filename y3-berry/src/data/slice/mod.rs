//! 原始扫描切片与 8-bit 灰度切片.

mod core;
mod iter;

pub use core::{GraySlice, NormalizedImage, OwnedScanSlice, ScanSlice};

pub(crate) use iter::PosIter;
