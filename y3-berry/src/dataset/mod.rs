//! 切片序列加载.
//!
//! 列出目录中受支持的切片文件, 按文件名排序后逐个解码. 单个文件解码失败时
//! 加载器返回 [`SliceError::Decode`], 不会中断迭代.
//!
//! 支持的格式:
//!
//! 1. `.npy`: 二维数组, 元素类型为 `f32`, `f64`, `i16`, `u16`, `i32` 之一;
//! 2. `.png`, `.tif`, `.tiff`: 按 16-bit 灰度读取.

use crate::{Slice, SliceError};
use ndarray::Array2;
use ndarray_npy::{read_npy, ReadNpyError};
use std::io;
use std::path::{Path, PathBuf};

/// 受支持的文件扩展名 (不区分大小写).
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["npy", "png", "tif", "tiff"];

/// 文件是否具有受支持的扩展名?
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

/// 创建目录 `dir` 的切片加载器. 目录无法读取时返回错误.
pub fn slice_loader<P: AsRef<Path>>(dir: P) -> io::Result<SliceLoader> {
    let mut files = Vec::new();
    for entry in dir.as_ref().read_dir()? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files.reverse();

    Ok(SliceLoader {
        requested: files.len(),
        files_rev: files,
    })
}

/// 切片序列加载器. 第 `i` 个元素即为索引为 `i` 的切片.
#[derive(Debug)]
pub struct SliceLoader {
    files_rev: Vec<PathBuf>,
    requested: usize,
}

impl SliceLoader {
    /// 目录中受支持的文件总数 (包括之后可能解码失败的).
    #[inline]
    pub fn requested(&self) -> usize {
        self.requested
    }
}

impl Iterator for SliceLoader {
    type Item = Result<Slice, SliceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files_rev.pop()?;
        Some(load_slice(&path))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.files_rev.len(), Some(self.files_rev.len()))
    }
}

impl ExactSizeIterator for SliceLoader {
    #[inline]
    fn len(&self) -> usize {
        self.files_rev.len()
    }
}

/// 解码单个切片文件. 来源标识为文件名.
pub fn load_slice(path: &Path) -> Result<Slice, SliceError> {
    let source_id = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy())
        .into_owned();
    let decode_error = |reason: String| SliceError::Decode {
        source_id: source_id.clone(),
        reason,
    };

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let data = match ext.as_deref() {
        Some("npy") => read_npy_any(path).map_err(|e| decode_error(e.to_string()))?,
        Some("png" | "tif" | "tiff") => read_image(path).map_err(decode_error)?,
        _ => return Err(decode_error("不支持的文件格式".to_owned())),
    };
    Ok(Slice::new(source_id, data))
}

/// 读取 `.npy` 二维数组并转换为 `f32`.
fn read_npy_any(path: &Path) -> Result<Array2<f32>, ReadNpyError> {
    macro_rules! try_as {
        ($t: ty) => {
            match read_npy::<_, Array2<$t>>(path) {
                Ok(arr) => return Ok(arr.mapv(|v| v as f32)),
                Err(ReadNpyError::WrongDescriptor(_)) => {}
                Err(e) => return Err(e),
            }
        };
    }
    try_as!(f64);
    try_as!(i16);
    try_as!(u16);
    try_as!(i32);
    read_npy::<_, Array2<f32>>(path)
}

/// 以 16-bit 灰度读取图像.
fn read_image(path: &Path) -> Result<Array2<f32>, String> {
    let img = image::open(path).map_err(|e| e.to_string())?.into_luma16();
    let (w, h) = img.dimensions();
    let pixels = img.into_raw().into_iter().map(f32::from).collect();
    Array2::from_shape_vec((h as usize, w as usize), pixels).map_err(|e| e.to_string())
}
