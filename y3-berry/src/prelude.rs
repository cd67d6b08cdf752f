//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::data::window::CtWindow;
pub use crate::data::{GraySlice, NormalizedImage, OwnedScanSlice, ScanSlice, Slice};

pub use crate::config::{ScoringConfig, ZoneBasis};
pub use crate::error::{ConfigError, ScanError, SliceError};

pub use crate::analysis::{
    analyze_slice, analyze_stack, Candidate, SliceAnalysis, StackAnalyzer, StackReport, Zone,
    ZoneOutcome,
};

pub use crate::dataset::{self, slice_loader};
