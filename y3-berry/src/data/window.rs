//! 百分位窗口: 将原始 CT 强度转换为 8-bit 灰度.

use crate::{NormalizedImage, WindowConfig};
use ndarray::{Array2, ArrayView2};

/// CT 窗口, 由窗下限和窗上限确定. 窗位 (level) 和窗宽 (width) 由两者导出.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CtWindow {
    lower: f64,
    upper: f64,
}

impl CtWindow {
    /// 以窗位和窗宽构建 CT 窗.
    ///
    /// `level` 和 `width` 必须是有限值且 `width > 0`, 否则返回 `None`.
    pub fn new(level: f64, width: f64) -> Option<CtWindow> {
        if level.is_finite() && width.is_finite() && width > 0.0 {
            Self::from_bounds(level - width / 2.0, level + width / 2.0)
        } else {
            None
        }
    }

    /// 以窗下限和窗上限构建 CT 窗. 要求 `lower < upper` 且均为有限值.
    ///
    /// `lower == upper` (退化窗口) 时返回 `None`, 调用方需要显式处理该情况.
    pub fn from_bounds(lower: f64, upper: f64) -> Option<CtWindow> {
        (lower.is_finite() && upper.is_finite() && lower < upper).then_some(Self { lower, upper })
    }

    /// 以 `data` 中有限值的 `low` / `high` 百分位作为窗下限/窗上限.
    ///
    /// 百分位采用线性插值. 若 `data` 没有有限值, 或两个百分位相等, 返回 `None`.
    pub fn from_percentiles(data: ArrayView2<f32>, low: f64, high: f64) -> Option<CtWindow> {
        let mut values: Vec<f64> = data
            .iter()
            .filter(|v| v.is_finite())
            .map(|&v| f64::from(v))
            .collect();
        values.sort_unstable_by(f64::total_cmp);
        let lower = percentile_sorted(&values, low)?;
        let upper = percentile_sorted(&values, high)?;
        Self::from_bounds(lower, upper)
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.upper
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// 求在当前窗口设置下, `ct` 对应的灰度图像素整数值 (0 <= value <= 255).
    /// 小数部分直接截断.
    ///
    /// 如果 `ct` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, ct: f64) -> Option<u8> {
        if !ct.is_finite() {
            return None;
        }
        if ct <= self.lower {
            Some(u8::MIN)
        } else if ct >= self.upper {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some(((ct - self.lower) / self.width() * 255.0) as u8)
        }
    }

    /// 求在当前窗口设置下, `ct` 对应的灰度分布点 (0.0 <= value <= 255.0).
    ///
    /// 如果 `ct` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_f64(&self, ct: f64) -> Option<f64> {
        if !ct.is_finite() {
            return None;
        }
        Some((ct.clamp(self.lower, self.upper) - self.lower) / self.width() * 255.0)
    }

    /// 用该窗口转换整张切片. 无意义的像素值映射为 0.
    pub fn apply(&self, data: ArrayView2<f32>) -> NormalizedImage {
        NormalizedImage::new(data.mapv(|v| self.eval(f64::from(v)).unwrap_or(u8::MIN)))
    }
}

/// 对升序排列的 `sorted` 求第 `p` 百分位 (`0 <= p <= 100`), 相邻秩之间线性插值.
///
/// `sorted` 为空或 `p` 越界时返回 `None`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (a, b) = (sorted[lo], sorted[hi]);
    let t = rank - lo as f64;
    // 从较近的一端插值, 端点处结果精确.
    Some(if t < 0.5 {
        a + (b - a) * t
    } else {
        b - (b - a) * (1.0 - t)
    })
}

/// 百分位窗口归一化.
///
/// 以 `config` 指定的百分位对 `raw` 截断, 再线性拉伸到 `[0, 255]`.
/// 两个百分位相等时 (如常数图像) 返回全零图像.
pub fn normalize(raw: ArrayView2<f32>, config: &WindowConfig) -> NormalizedImage {
    match CtWindow::from_percentiles(raw, config.low_percentile, config.high_percentile) {
        Some(window) => window.apply(raw),
        None => {
            log::debug!("窗口退化 (上下百分位相等), 输出全零图像");
            NormalizedImage::new(Array2::zeros(raw.raw_dim()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn is_valid_init(level: f64, width: f64) -> bool {
        CtWindow::new(level, width).is_some()
    }

    #[test]
    fn test_ct_window_invalid_input() {
        assert!(!is_valid_init(0.0, -1.0));
        assert!(!is_valid_init(0.0, 0.0));
        assert!(!is_valid_init(f64::NAN, 10.0));
        assert!(CtWindow::from_bounds(3.0, 3.0).is_none());
    }

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_window_eval_truncates() {
        // 窗口 [-100, 300], 宽 400.
        let win = CtWindow::from_bounds(-100.0, 300.0).unwrap();
        assert!(float_eq(win.level(), 100.0));
        assert!(float_eq(win.width(), 400.0));
        assert_eq!(CtWindow::new(100.0, 400.0), Some(win));

        assert_eq!(win.eval(f64::INFINITY), None);
        assert_eq!(win.eval(-1e9), Some(0));
        assert_eq!(win.eval(-100.0), Some(0));
        assert_eq!(win.eval(300.0), Some(255));
        // 299 -> 254.36, 截断而不是四舍五入.
        assert_eq!(win.eval(299.0), Some(254));
        assert_eq!(win.eval(100.0), Some(127));
        assert!(float_eq(win.eval_f64(100.0).unwrap(), 127.5));
        assert!(float_eq(win.eval_f64(1e9).unwrap(), 255.0));
    }

    #[test]
    fn test_percentile_linear() {
        let v: Vec<f64> = (0..=100).map(f64::from).collect();
        assert_eq!(percentile_sorted(&v, 1.0), Some(1.0));
        assert_eq!(percentile_sorted(&v, 99.0), Some(99.0));
        assert_eq!(percentile_sorted(&v, 0.0), Some(0.0));
        assert_eq!(percentile_sorted(&v, 100.0), Some(100.0));

        let v = [0.0, 10.0];
        assert!(float_eq(percentile_sorted(&v, 25.0).unwrap(), 2.5));
        assert!(float_eq(percentile_sorted(&v, 75.0).unwrap(), 7.5));

        assert_eq!(percentile_sorted(&[], 50.0), None);
        assert_eq!(percentile_sorted(&v, 101.0), None);
    }

    #[test]
    fn test_normalize_clips_and_scales() {
        let raw = Array2::from_shape_fn((1, 101), |(_, w)| w as f32);
        let img = normalize(raw.view(), &WindowConfig::default());
        let img = img.as_gray();
        assert_eq!(img[(0, 0)], 0);
        assert_eq!(img[(0, 1)], 0);
        // (50 - 1) / 98 * 255 = 127.5
        assert_eq!(img[(0, 50)], 127);
        assert_eq!(img[(0, 99)], 255);
        assert_eq!(img[(0, 100)], 255);
    }

    #[test]
    fn test_normalize_degenerate_range() {
        let raw = Array2::from_elem((8, 8), 42.0f32);
        let img = normalize(raw.view(), &WindowConfig::default());
        assert_eq!(img.shape(), (8, 8));
        assert!(img.as_gray().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_normalize_non_finite_pixels() {
        let mut raw = Array2::from_shape_fn((4, 25), |(h, w)| (h * 25 + w) as f32);
        raw[(0, 3)] = f32::NAN;
        let img = normalize(raw.view(), &WindowConfig::default());
        assert_eq!(img.as_gray()[(0, 3)], 0);
        assert_eq!(img.as_gray()[(3, 24)], 255);
    }

    #[test]
    fn test_normalize_idempotent_on_normalized() {
        // 低端和高端各占 20%, 1/99 百分位恰好为 0/255.
        let raw = Array2::from_shape_fn((10, 10), |(h, w)| match h {
            0 | 1 => 0.0,
            8 | 9 => 255.0,
            _ => ((h * 10 + w) * 2) as f32,
        });
        let once = normalize(raw.view(), &WindowConfig::default());
        let again_raw = once.as_gray().data().mapv(f32::from);
        let twice = normalize(again_raw.view(), &WindowConfig::default());
        for (a, b) in once.as_gray().iter().zip(twice.as_gray().iter()) {
            assert!(a.abs_diff(*b) <= 1);
        }
    }
}
