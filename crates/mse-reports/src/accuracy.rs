//! Accuracy aggregation
//!
//! Correctness is always judged against the image's stored ground truth.
//! Percentages are `None` when there is nothing to divide by.

use std::cmp::Ordering;
use std::collections::HashMap;

use mse_core::traits::Id;
use mse_core::types::{Confidence, ImageKind};
use mse_models::{Clinician, EvaluationDetail};
use serde::Serialize;

/// Running count of evaluations and correct ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub correct: usize,
}

impl Tally {
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// `100 * correct / total`, or `None` when empty
    pub fn accuracy(&self) -> Option<f64> {
        percentage(self.correct, self.total)
    }
}

fn percentage(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 * 100.0 / whole as f64)
    }
}

/// Accuracy restricted to one image kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindAccuracy {
    pub total: usize,
    pub correct: usize,
    pub accuracy: Option<f64>,
}

impl From<Tally> for KindAccuracy {
    fn from(tally: Tally) -> Self {
        Self {
            total: tally.total,
            correct: tally.correct,
            accuracy: tally.accuracy(),
        }
    }
}

/// Count and share of one confidence rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingShare {
    pub rating: u8,
    pub count: usize,
    pub percentage: f64,
}

/// Ratings 1 through 5 in order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfidenceDistribution([RatingShare; 5]);

impl ConfidenceDistribution {
    /// Build from per-rating counts indexed by `rating - 1`
    fn from_counts(counts: [usize; 5]) -> Self {
        let total: usize = counts.iter().sum();
        let mut shares = [RatingShare {
            rating: 0,
            count: 0,
            percentage: 0.0,
        }; 5];
        for (share, rating) in shares.iter_mut().zip(Confidence::all()) {
            let count = counts[usize::from(rating.value() - 1)];
            *share = RatingShare {
                rating: rating.value(),
                count,
                percentage: percentage(count, total).unwrap_or(0.0),
            };
        }
        Self(shares)
    }

    pub fn shares(&self) -> &[RatingShare; 5] {
        &self.0
    }

    pub fn get(&self, rating: u8) -> Option<&RatingShare> {
        self.0.iter().find(|s| s.rating == rating)
    }
}

impl Default for ConfidenceDistribution {
    fn default() -> Self {
        Self::from_counts([0; 5])
    }
}

/// Metrics over one group of evaluations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub total: usize,
    pub correct: usize,
    pub accuracy: Option<f64>,
    pub real: KindAccuracy,
    pub synthetic: KindAccuracy,
    pub average_confidence: Option<f64>,
    pub confidence_distribution: ConfidenceDistribution,
}

impl AccuracySummary {
    pub fn from_details<'a>(details: impl IntoIterator<Item = &'a EvaluationDetail>) -> Self {
        let mut overall = Tally::default();
        let mut real = Tally::default();
        let mut synthetic = Tally::default();
        let mut counts = [0usize; 5];
        let mut confidence_sum: i64 = 0;

        for detail in details {
            let correct = detail.is_correct();
            overall.record(correct);
            match detail.kind() {
                ImageKind::Real => real.record(correct),
                ImageKind::Synthetic => synthetic.record(correct),
            }

            confidence_sum += i64::from(detail.confidence);
            if let Some(confidence) = Confidence::new(i64::from(detail.confidence)) {
                counts[usize::from(confidence.value() - 1)] += 1;
            }
        }

        let average_confidence = if overall.total == 0 {
            None
        } else {
            Some(confidence_sum as f64 / overall.total as f64)
        };

        Self {
            total: overall.total,
            correct: overall.correct,
            accuracy: overall.accuracy(),
            real: real.into(),
            synthetic: synthetic.into(),
            average_confidence,
            confidence_distribution: ConfidenceDistribution::from_counts(counts),
        }
    }

    pub fn empty() -> Self {
        Self::from_details(std::iter::empty())
    }
}

/// One clinician's row in the ranking
#[derive(Debug, Clone, Serialize)]
pub struct ClinicianStats {
    /// 1-based position in the ranking
    pub rank: usize,
    pub clinician_id: Id,
    pub username: String,
    pub full_name: String,
    pub title: String,
    pub workplace: String,
    pub years_experience: i32,
    #[serde(flatten)]
    pub summary: AccuracySummary,
}

impl ClinicianStats {
    pub fn new<'a>(
        clinician: &Clinician,
        details: impl IntoIterator<Item = &'a EvaluationDetail>,
    ) -> Self {
        Self {
            rank: 0,
            clinician_id: clinician.id,
            username: clinician.username.clone(),
            full_name: clinician.full_name(),
            title: clinician.title.clone(),
            workplace: clinician.workplace.clone(),
            years_experience: clinician.years_experience,
            summary: AccuracySummary::from_details(details),
        }
    }
}

/// Accuracy descending, then evaluation count descending, then username.
/// Clinicians without evaluations come last, by username.
fn ranking_order(a: &ClinicianStats, b: &ClinicianStats) -> Ordering {
    match (a.summary.accuracy, b.summary.accuracy) {
        (Some(x), Some(y)) => y
            .total_cmp(&x)
            .then_with(|| b.summary.total.cmp(&a.summary.total))
            .then_with(|| a.username.cmp(&b.username)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.username.cmp(&b.username),
    }
}

/// Overall metrics plus the ranked per-clinician rows
#[derive(Debug, Clone, Serialize)]
pub struct AccuracyReport {
    pub overall: AccuracySummary,
    pub clinicians: Vec<ClinicianStats>,
}

impl AccuracyReport {
    pub fn for_clinician(&self, clinician_id: Id) -> Option<&ClinicianStats> {
        self.clinicians
            .iter()
            .find(|s| s.clinician_id == clinician_id)
    }
}

/// Aggregate every evaluation row into the admin report
///
/// `overall` covers all rows; each clinician gets a row even with no
/// evaluations.
pub fn build_report(clinicians: &[Clinician], details: &[EvaluationDetail]) -> AccuracyReport {
    let mut by_clinician: HashMap<Id, Vec<&EvaluationDetail>> = HashMap::new();
    for detail in details {
        by_clinician
            .entry(detail.clinician_id)
            .or_default()
            .push(detail);
    }

    let mut rows: Vec<ClinicianStats> = clinicians
        .iter()
        .map(|clinician| {
            let own = by_clinician
                .get(&clinician.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            ClinicianStats::new(clinician, own.iter().copied())
        })
        .collect();

    rows.sort_by(ranking_order);
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }

    AccuracyReport {
        overall: AccuracySummary::from_details(details),
        clinicians: rows,
    }
}

/// Render a percentage for display: one decimal, or "N/A"
pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "N/A".to_string(),
    }
}
