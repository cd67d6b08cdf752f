//! 单张切片综合评分与整个序列的分析.

mod progression;
mod recommend;
mod slice;
mod stack;

pub use progression::{progression_quality, FormationStages, Progression, Verdict};
pub use recommend::{Interpretation, QualityIndicators, Recommendation, SliceStatus, Tier};
pub use slice::{analyze_slice, SliceAnalysis, SliceScorer};
pub use stack::{analyze_stack, Candidate, Phase, StackAnalyzer, StackReport, Zone, ZoneOutcome};
