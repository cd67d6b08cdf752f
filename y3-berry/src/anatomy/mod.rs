//! 单张切片的四项解剖学子评分.
//!
//! 除位置评分外, 所有评分都作用于归一化后的 8-bit 图像. 每项评分都是纯函数,
//! 阈值与分段全部来自 [`crate::ScoringConfig`] 的对应字段.

pub mod position;
pub mod ribs;
pub mod shape;
pub mod vertebra;

pub use position::{calculate_position_score, FilenameOrdinal, PositionStrategy, RelativePosition};
pub use ribs::{count_lateral_bone_structures, lateral_strips, verify_no_lateral_ribs, RibReport};
pub use shape::{detect_central_y_shape, ShapeMetrics, ShapeReport};
pub use vertebra::{analyze_central_vertebra, VertebraReport};
