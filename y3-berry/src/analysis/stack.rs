//! 整个切片序列的分析: 扫描、排序、Y3 区间评估.
//!
//! 分析按如下阶段推进:
//!
//! `Idle -> Scanning -> Ranking -> ZoneEvaluation -> {ZoneFound, ZoneNotFound} -> Done`
//!
//! 单张切片解码失败或形状不一致只会被记录并跳过, 不会中断整个序列.
//! 序列为空和找不到 Y3 区间都不是错误, 见 [`ZoneOutcome`].

use super::progression::{FormationStages, Progression};
use super::recommend::{self, Recommendation, SliceStatus};
use super::slice::{SliceAnalysis, SliceScorer};
use crate::{
    ConfigError, Idx2d, RecommendationConfig, ScanError, ScoringConfig, Slice, SliceError,
    ZoneBasis,
};
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 序列分析的阶段.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// 尚未开始.
    Idle,
    /// 逐张评分.
    Scanning,
    /// 按综合评分降序排序.
    Ranking,
    /// 计算 Y3 区间.
    ZoneEvaluation,
    /// 区间内有候选切片.
    ZoneFound,
    /// 区间内没有候选切片.
    ZoneNotFound,
    /// 结束.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Scanning => "scanning",
            Phase::Ranking => "ranking",
            Phase::ZoneEvaluation => "zone evaluation",
            Phase::ZoneFound => "zone found",
            Phase::ZoneNotFound => "zone not found",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

#[inline]
fn enter(phase: Phase) {
    log::debug!("序列分析阶段: {phase}");
}

/// 候选切片: 排序和筛选的基本单位.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// 切片在序列中的索引.
    pub index: usize,

    /// 来源标识.
    pub source_id: String,

    /// 综合评分.
    pub score: f64,

    /// 完整的分析结果.
    pub analysis: SliceAnalysis,
}

/// Y3 区间: 序列尾部一段连续索引 `[start, end]` 及其中的候选切片.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Zone {
    /// 起始索引.
    pub start: usize,

    /// 结束索引 (含).
    pub end: usize,

    /// 区间内的候选, 按索引升序. 不为空.
    pub candidates: Vec<Candidate>,

    /// 区间内评分最高的候选. 评分相同时取排序靠前者.
    pub best: Candidate,

    /// 形成过程质量.
    pub progression: Progression,
}

impl Zone {
    /// 区间覆盖的索引个数 `end - start + 1`.
    #[inline]
    pub fn size(&self) -> usize {
        self.end - self.start + 1
    }

    /// `index` 是否在区间内.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// 有效切片 (成功分析的候选) 占区间的百分比.
    #[inline]
    pub fn coverage(&self) -> f64 {
        self.candidates.len() as f64 / self.size() as f64 * 100.0
    }

    /// 形成过程的早期、中期和最优阶段.
    #[inline]
    pub fn stages(&self) -> Option<FormationStages<'_>> {
        FormationStages::from_sorted(&self.candidates)
    }
}

/// 区间评估的终态.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum ZoneOutcome {
    /// 没有任何可分析的切片.
    NoData,

    /// 找到了 Y3 区间.
    Found(Zone),

    /// 区间内没有候选. 以全局评分最高的切片作为备选, 需要人工复核.
    NotFound {
        /// 全局评分最高的候选.
        fallback: Candidate,
    },
}

/// 序列分析报告.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct StackReport {
    /// 序列中的切片总数 (包括被跳过的).
    pub requested: usize,

    /// 被跳过的切片及原因, 按索引升序.
    pub skipped: Vec<(usize, SliceError)>,

    /// 全部候选, 按综合评分降序. 评分相同时保持索引顺序.
    pub ranked: Vec<Candidate>,

    /// 区间评估结果.
    pub outcome: ZoneOutcome,
}

impl StackReport {
    /// 成功分析的切片数.
    #[inline]
    pub fn analyzed(&self) -> usize {
        self.ranked.len()
    }

    /// Y3 区间.
    #[inline]
    pub fn zone(&self) -> Option<&Zone> {
        match &self.outcome {
            ZoneOutcome::Found(zone) => Some(zone),
            _ => None,
        }
    }

    /// 推荐切片: 区间内的最佳候选, 或找不到区间时的全局备选.
    pub fn best(&self) -> Option<&Candidate> {
        match &self.outcome {
            ZoneOutcome::NoData => None,
            ZoneOutcome::Found(zone) => Some(&zone.best),
            ZoneOutcome::NotFound { fallback } => Some(fallback),
        }
    }

    /// 形成过程质量. 没有区间时为 0.
    #[inline]
    pub fn progression_quality(&self) -> f64 {
        self.zone().map_or(0.0, |z| z.progression.quality)
    }

    /// 结果是否需要人工复核 (没有找到区间).
    #[inline]
    pub fn needs_manual_review(&self) -> bool {
        !matches!(self.outcome, ZoneOutcome::Found(_))
    }

    /// 评分最高的 `k` 个候选.
    #[inline]
    pub fn top(&self, k: usize) -> &[Candidate] {
        &self.ranked[..k.min(self.ranked.len())]
    }

    /// 分析结束时所处的终态阶段.
    pub fn terminal_phase(&self) -> Phase {
        match self.outcome {
            ZoneOutcome::NoData => Phase::Done,
            ZoneOutcome::Found(_) => Phase::ZoneFound,
            ZoneOutcome::NotFound { .. } => Phase::ZoneNotFound,
        }
    }

    /// 第 `index` 张切片相对于本报告的状态.
    #[inline]
    pub fn status_of(&self, index: usize) -> SliceStatus {
        recommend::slice_status(self, index)
    }

    /// 针对推荐切片的最终建议. 没有数据时返回 `None`.
    #[inline]
    pub fn recommendation(&self, config: &RecommendationConfig) -> Option<Recommendation> {
        recommend::recommend(self, config)
    }
}

/// 序列分析器. 持有一份经过校验的评分配置.
#[derive(Clone, Debug)]
pub struct StackAnalyzer {
    config: ScoringConfig,
}

impl StackAnalyzer {
    /// 校验配置并构建分析器.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 评分配置.
    #[inline]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// 分析整个有序序列. `slices` 中的第 `i` 项就是索引为 `i` 的切片.
    pub fn analyze_stack<I>(&self, slices: I) -> StackReport
    where
        I: IntoIterator<Item = Result<Slice, SliceError>>,
    {
        let admission = admit(slices);
        // 取消标志从不设置, 扫描总会完成.
        let candidates = self
            .scan(&admission, &AtomicBool::new(false))
            .unwrap_or_default();
        self.finish(admission, candidates)
    }

    /// 与 [`StackAnalyzer::analyze_stack`] 相同, 但每张切片开始分析前检查 `cancel`.
    /// 标志被设置后不再分析剩余切片, 返回 [`ScanError::Cancelled`].
    pub fn scan_with_cancel<I>(
        &self,
        slices: I,
        cancel: &AtomicBool,
    ) -> Result<StackReport, ScanError>
    where
        I: IntoIterator<Item = Result<Slice, SliceError>>,
    {
        let admission = admit(slices);
        match self.scan(&admission, cancel) {
            Ok(candidates) => Ok(self.finish(admission, candidates)),
            Err(analyzed) => {
                let requested = admission.requested;
                log::warn!("扫描在分析 {analyzed}/{requested} 张切片后被取消");
                Err(ScanError::Cancelled {
                    analyzed,
                    requested,
                })
            }
        }
    }

    /// 对通过检查的切片逐张评分. 被取消时返回已完成的张数.
    fn scan(&self, admission: &Admission, cancel: &AtomicBool) -> Result<Vec<Candidate>, usize> {
        enter(Phase::Scanning);
        let scorer = SliceScorer::new(&self.config);
        let basis = self.config.zone.basis;
        let total = match basis {
            ZoneBasis::Analyzed => admission.slices.len(),
            ZoneBasis::Requested => admission.requested,
        };
        let job = |ordinal: usize, (index, slice): &(usize, Slice)| -> Option<Candidate> {
            if cancel.load(Ordering::Acquire) {
                return None;
            }
            let position_index = match basis {
                ZoneBasis::Analyzed => ordinal,
                ZoneBasis::Requested => *index,
            };
            let analysis = scorer.analyze(slice.scan(), position_index, slice.source_id(), total);
            Some(Candidate {
                index: *index,
                source_id: slice.source_id().to_owned(),
                score: analysis.composite,
                analysis,
            })
        };

        let results = run_jobs(&admission.slices, job);
        let analyzed = results.iter().flatten().count();
        if analyzed < admission.slices.len() {
            return Err(analyzed);
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// 排序并评估区间.
    fn finish(&self, admission: Admission, mut candidates: Vec<Candidate>) -> StackReport {
        enter(Phase::Ranking);
        candidates.sort_by_key(|c| Reverse(OrderedFloat(c.score)));

        enter(Phase::ZoneEvaluation);
        let analyzed: Vec<usize> = admission.slices.iter().map(|(i, _)| *i).collect();
        let outcome = self.evaluate_zone(&candidates, &analyzed, admission.requested);
        match &outcome {
            ZoneOutcome::NoData => log::info!("序列中没有可分析的切片"),
            ZoneOutcome::Found(zone) => {
                enter(Phase::ZoneFound);
                log::info!(
                    "Y3 区间 [{}, {}]: {}/{} 张有效切片, 形成质量 {:.1}% ({}), 最佳切片 #{} `{}` ({:.1})",
                    zone.start,
                    zone.end,
                    zone.candidates.len(),
                    zone.size(),
                    zone.progression.quality,
                    zone.progression.verdict,
                    zone.best.index,
                    zone.best.source_id,
                    zone.best.score,
                );
            }
            ZoneOutcome::NotFound { fallback } => {
                enter(Phase::ZoneNotFound);
                log::info!(
                    "区间内没有候选切片, 备选 #{} `{}` ({:.1}), 需要人工复核",
                    fallback.index,
                    fallback.source_id,
                    fallback.score,
                );
            }
        }
        enter(Phase::Done);

        StackReport {
            requested: admission.requested,
            skipped: admission.skipped,
            ranked: candidates,
            outcome,
        }
    }

    /// 求区间 `[start, end]`, 筛选其中的候选并评估形成过程质量.
    ///
    /// `ranked` 按评分降序; `analyzed` 为成功分析切片的索引, 升序.
    fn evaluate_zone(&self, ranked: &[Candidate], analyzed: &[usize], requested: usize) -> ZoneOutcome {
        let Some(top) = ranked.first() else {
            return ZoneOutcome::NoData;
        };
        let not_found = || ZoneOutcome::NotFound {
            fallback: top.clone(),
        };

        let Some((start, end)) = zone_bounds(
            self.config.zone.start_fraction,
            self.config.zone.basis,
            analyzed,
            requested,
        ) else {
            return not_found();
        };

        // 保持降序, 第一个就是最佳候选.
        let mut candidates: Vec<Candidate> = ranked
            .iter()
            .filter(|c| (start..=end).contains(&c.index))
            .cloned()
            .collect();
        let Some(best) = candidates.first().cloned() else {
            return not_found();
        };
        candidates.sort_by_key(|c| c.index);

        let scores: Vec<f64> = candidates.iter().map(|c| c.score).collect();
        let progression = Progression::evaluate(&scores, &self.config.progression);
        ZoneOutcome::Found(Zone {
            start,
            end,
            candidates,
            best,
            progression,
        })
    }
}

/// 分析给定序列. 配置不合法时返回 [`ScanError::Config`].
pub fn analyze_stack<I>(slices: I, config: &ScoringConfig) -> Result<StackReport, ScanError>
where
    I: IntoIterator<Item = Result<Slice, SliceError>>,
{
    Ok(StackAnalyzer::new(config.clone())?.analyze_stack(slices))
}

/// 求区间的起止索引. 区间为空时返回 `None`.
///
/// - [`ZoneBasis::Analyzed`]: `N` 为成功分析的切片数, 区间是第 `floor(f * N)`
///   张到最后一张成功分析的切片, 起止以它们的索引表示.
/// - [`ZoneBasis::Requested`]: `N` 为序列长度, 区间为 `[floor(f * N), N - 1]`.
fn zone_bounds(
    fraction: f64,
    basis: ZoneBasis,
    analyzed: &[usize],
    requested: usize,
) -> Option<Idx2d> {
    match basis {
        ZoneBasis::Analyzed => {
            let n = analyzed.len();
            let first = (fraction * n as f64).floor() as usize;
            Some((*analyzed.get(first)?, *analyzed.last()?))
        }
        ZoneBasis::Requested => {
            let start = (fraction * requested as f64).floor() as usize;
            (start < requested).then(|| (start, requested - 1))
        }
    }
}

/// 通过检查、等待评分的切片, 以及被跳过的切片.
struct Admission {
    requested: usize,
    slices: Vec<(usize, Slice)>,
    skipped: Vec<(usize, SliceError)>,
}

/// 收集序列, 跳过解码失败的切片和与第一张可用切片形状不一致的切片.
fn admit<I>(slices: I) -> Admission
where
    I: IntoIterator<Item = Result<Slice, SliceError>>,
{
    enter(Phase::Idle);
    let mut admission = Admission {
        requested: 0,
        slices: Vec::new(),
        skipped: Vec::new(),
    };
    let mut expected: Option<Idx2d> = None;
    for (index, entry) in slices.into_iter().enumerate() {
        admission.requested += 1;
        let checked = entry.and_then(|slice| {
            let found = slice.shape();
            match expected {
                Some(expected) if expected != found => Err(SliceError::ShapeMismatch {
                    source_id: slice.source_id().to_owned(),
                    expected,
                    found,
                }),
                _ => {
                    expected = Some(found);
                    Ok(slice)
                }
            }
        });
        match checked {
            Ok(slice) => admission.slices.push((index, slice)),
            Err(e) => {
                log::warn!("跳过切片 #{index}: {e}");
                admission.skipped.push((index, e));
            }
        }
    }
    admission
}

/// 借助 `rayon` 并行执行 `job`, 结果保持输入顺序.
#[cfg(feature = "rayon")]
fn run_jobs<F>(slices: &[(usize, Slice)], job: F) -> Vec<Option<Candidate>>
where
    F: Fn(usize, &(usize, Slice)) -> Option<Candidate> + Sync + Send,
{
    slices
        .par_iter()
        .enumerate()
        .map(|(ordinal, entry)| job(ordinal, entry))
        .collect()
}

/// 顺序执行 `job`. 一旦某个任务被取消, 后续任务不再执行.
#[cfg(not(feature = "rayon"))]
fn run_jobs<F>(slices: &[(usize, Slice)], job: F) -> Vec<Option<Candidate>>
where
    F: Fn(usize, &(usize, Slice)) -> Option<Candidate>,
{
    let mut results = Vec::with_capacity(slices.len());
    for (ordinal, entry) in slices.iter().enumerate() {
        let result = job(ordinal, entry);
        let cancelled = result.is_none();
        results.push(result);
        if cancelled {
            break;
        }
    }
    results
}
