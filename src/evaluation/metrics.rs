use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::classification::Label;

#[derive(Debug, Default, Clone, Copy)]
struct LabelStats {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
    support: usize, // 正解データに含まれるそのラベルの個数
}

/// 1クラス分の指標。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// ホールドアウトに対する分類レポート。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub per_class: BTreeMap<Label, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub total: usize,
}

/// 期待ラベルと予測ラベルを集計する。
#[derive(Debug, Default)]
pub struct MetricsCalculator {
    per_label: BTreeMap<Label, LabelStats>,
    total_samples: usize,
    correct_samples: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl MetricsCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expected: Label, predicted: Label) {
        self.total_samples += 1;

        let expected_stats = self.per_label.entry(expected).or_default();
        expected_stats.support += 1;
        if expected == predicted {
            expected_stats.true_positive += 1;
            self.correct_samples += 1;
        } else {
            expected_stats.false_negative += 1;
            self.per_label.entry(predicted).or_default().false_positive += 1;
        }
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct_samples, self.total_samples)
    }

    #[must_use]
    pub fn finalize(&self) -> ClassificationReport {
        let per_class: BTreeMap<Label, ClassMetrics> = self
            .per_label
            .iter()
            .map(|(label, stats)| {
                let precision = ratio(
                    stats.true_positive,
                    stats.true_positive + stats.false_positive,
                );
                let recall = ratio(
                    stats.true_positive,
                    stats.true_positive + stats.false_negative,
                );
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                (
                    *label,
                    ClassMetrics {
                        precision,
                        recall,
                        f1,
                        support: stats.support,
                    },
                )
            })
            .collect();

        let counted = per_class.len() as f64;
        let total_support: usize = per_class.values().map(|m| m.support).sum();
        let mean = |pick: fn(&ClassMetrics) -> f64| {
            if counted > 0.0 {
                per_class.values().map(pick).sum::<f64>() / counted
            } else {
                0.0
            }
        };
        let weighted = |pick: fn(&ClassMetrics) -> f64| {
            if total_support > 0 {
                per_class
                    .values()
                    .map(|m| pick(m) * m.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            } else {
                0.0
            }
        };

        let macro_avg = ClassMetrics {
            precision: mean(|m| m.precision),
            recall: mean(|m| m.recall),
            f1: mean(|m| m.f1),
            support: total_support,
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total_support,
        };

        ClassificationReport {
            per_class,
            accuracy: self.accuracy(),
            macro_avg,
            weighted_avg,
            total: self.total_samples,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, metrics) in &self.per_class {
            write_row(f, label.as_str(), metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, metrics: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
        name, metrics.precision, metrics.recall, metrics.f1, metrics.support
    )
}
