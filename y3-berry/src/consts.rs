//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色. 二值掩膜中代表背景.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色. 二值掩膜中代表前景.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 二值掩膜像素是否是前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        matches!(p, WHITE)
    }
}

/// 子评分与综合评分的上限.
pub const MAX_SCORE: f64 = 100.0;
