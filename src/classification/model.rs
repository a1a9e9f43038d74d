//! 多項ナイーブベイズ分類器。
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::label::Label;
use super::vectorizer::SparseVector;

/// ラプラス平滑化の既定値。
pub const DEFAULT_ALPHA: f64 = 1.0;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("cannot fit a classifier on an empty training set")]
    EmptyTrainingSet,
    #[error("feature rows ({features}) and labels ({labels}) differ in length")]
    LengthMismatch { features: usize, labels: usize },
    #[error("alpha must be positive and finite, got {0}")]
    InvalidAlpha(f64),
    #[error("feature index {index} is outside the model dimension {dimension}")]
    DimensionMismatch { index: usize, dimension: usize },
    #[error("posterior is not finite")]
    NonFinitePosterior,
}

/// 1入力に対する事後分布。`classes` と `probabilities` は同じ並び。
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    pub label: Label,
    pub classes: Vec<Label>,
    pub probabilities: Vec<f64>,
}

impl Posterior {
    /// 最大事後確率。
    #[must_use]
    pub fn max_probability(&self) -> f64 {
        self.probabilities
            .iter()
            .copied()
            .fold(0.0_f64, f64::max)
    }

    #[must_use]
    pub fn probability_of(&self, label: Label) -> Option<f64> {
        self.classes
            .iter()
            .position(|class| *class == label)
            .map(|idx| self.probabilities[idx])
    }
}

/// 永続化される状態。読み込み時に形状を検証してからモデルにする。
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelState {
    classes: Vec<Label>,
    class_count: Vec<usize>,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
    alpha: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelState", into = "ModelState")]
pub struct NaiveBayesModel {
    classes: Vec<Label>,
    class_count: Vec<usize>,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
    alpha: f64,
}

impl TryFrom<ModelState> for NaiveBayesModel {
    type Error = String;

    fn try_from(state: ModelState) -> Result<Self, Self::Error> {
        let n_classes = state.classes.len();
        if n_classes == 0 {
            return Err("model has no classes".to_string());
        }
        for (field, len) in [
            ("class_count", state.class_count.len()),
            ("class_log_prior", state.class_log_prior.len()),
            ("feature_log_prob", state.feature_log_prob.len()),
        ] {
            if len != n_classes {
                return Err(format!(
                    "{field} has {len} rows but the model has {n_classes} classes"
                ));
            }
        }
        if let Some((row, log_prob)) = state
            .feature_log_prob
            .iter()
            .enumerate()
            .find(|(_, log_prob)| log_prob.len() != state.n_features)
        {
            return Err(format!(
                "feature_log_prob row {row} has {} weights, expected {}",
                log_prob.len(),
                state.n_features
            ));
        }
        if !(state.alpha.is_finite() && state.alpha > 0.0) {
            return Err(format!("alpha must be positive and finite, got {}", state.alpha));
        }
        Ok(Self {
            classes: state.classes,
            class_count: state.class_count,
            class_log_prior: state.class_log_prior,
            feature_log_prob: state.feature_log_prob,
            n_features: state.n_features,
            alpha: state.alpha,
        })
    }
}

impl From<NaiveBayesModel> for ModelState {
    fn from(model: NaiveBayesModel) -> Self {
        Self {
            classes: model.classes,
            class_count: model.class_count,
            class_log_prior: model.class_log_prior,
            feature_log_prob: model.feature_log_prob,
            n_features: model.n_features,
            alpha: model.alpha,
        }
    }
}

impl NaiveBayesModel {
    /// TF-IDF 行列とラベルから学習する。
    ///
    /// クラスは学習データに現れたラベルを辞書順に並べたもの。
    ///
    /// # Errors
    /// 学習データが空、長さ不一致、`alpha` が不正、または特徴インデックスが次元外の場合。
    pub fn fit(
        features: &[SparseVector],
        labels: &[Label],
        n_features: usize,
        alpha: f64,
    ) -> Result<Self, ModelError> {
        if features.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(ModelError::InvalidAlpha(alpha));
        }

        let mut classes: Vec<Label> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let mut class_count = vec![0_usize; classes.len()];
        let mut feature_count = vec![vec![0.0_f64; n_features]; classes.len()];
        for (row, label) in features.iter().zip(labels) {
            let class_idx = classes
                .iter()
                .position(|class| class == label)
                .unwrap_or_default();
            class_count[class_idx] += 1;
            for (idx, value) in row.iter() {
                if idx >= n_features {
                    return Err(ModelError::DimensionMismatch {
                        index: idx,
                        dimension: n_features,
                    });
                }
                feature_count[class_idx][idx] += value;
            }
        }

        let total = features.len() as f64;
        let class_log_prior = class_count
            .iter()
            .map(|count| (*count as f64 / total).ln())
            .collect();

        let feature_log_prob = feature_count
            .iter()
            .map(|counts| {
                let smoothed_total: f64 =
                    counts.iter().sum::<f64>() + alpha * n_features as f64;
                let log_total = smoothed_total.ln();
                counts
                    .iter()
                    .map(|count| (count + alpha).ln() - log_total)
                    .collect()
            })
            .collect();

        Ok(Self {
            classes,
            class_count,
            class_log_prior,
            feature_log_prob,
            n_features,
            alpha,
        })
    }

    fn joint_log_likelihood(&self, features: &SparseVector) -> Result<Vec<f64>, ModelError> {
        let mut scores = self.class_log_prior.clone();
        for (idx, value) in features.iter() {
            if idx >= self.n_features {
                return Err(ModelError::DimensionMismatch {
                    index: idx,
                    dimension: self.n_features,
                });
            }
            for (score, log_prob) in scores.iter_mut().zip(&self.feature_log_prob) {
                *score += value * log_prob[idx];
            }
        }
        Ok(scores)
    }

    /// 事後分布と予測ラベルを返す。同率の場合は先頭クラスを採用する。
    ///
    /// # Errors
    /// 特徴次元の不一致、または事後確率が有限でない場合。
    pub fn posterior(&self, features: &SparseVector) -> Result<Posterior, ModelError> {
        let jll = self.joint_log_likelihood(features)?;
        let peak = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let log_norm = peak + jll.iter().map(|v| (v - peak).exp()).sum::<f64>().ln();
        let probabilities: Vec<f64> = jll.iter().map(|v| (v - log_norm).exp()).collect();

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::NonFinitePosterior);
        }

        let mut best = 0;
        for (idx, probability) in probabilities.iter().enumerate() {
            if *probability > probabilities[best] {
                best = idx;
            }
        }

        Ok(Posterior {
            label: self.classes[best],
            classes: self.classes.clone(),
            probabilities,
        })
    }

    /// # Errors
    /// [`Self::posterior`] と同じ。
    pub fn predict(&self, features: &SparseVector) -> Result<Label, ModelError> {
        self.posterior(features).map(|posterior| posterior.label)
    }

    /// # Errors
    /// [`Self::posterior`] と同じ。
    pub fn predict_proba(&self, features: &SparseVector) -> Result<Vec<f64>, ModelError> {
        self.posterior(features)
            .map(|posterior| posterior.probabilities)
    }

    #[must_use]
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    #[must_use]
    pub fn class_count(&self) -> &[usize] {
        &self.class_count
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(usize, f64)]) -> SparseVector {
        SparseVector {
            indices: entries.iter().map(|(idx, _)| *idx).collect(),
            values: entries.iter().map(|(_, value)| *value).collect(),
        }
    }

    fn toy_model() -> NaiveBayesModel {
        let features = vec![
            vector(&[(0, 1.0)]),
            vector(&[(0, 0.8), (2, 0.6)]),
            vector(&[(1, 1.0)]),
            vector(&[(1, 0.6), (2, 0.8)]),
        ];
        let labels = vec![Label::Real, Label::Real, Label::Fake, Label::Fake];
        NaiveBayesModel::fit(&features, &labels, 3, DEFAULT_ALPHA).expect("fit")
    }

    #[test]
    fn classes_are_sorted() {
        let model = toy_model();
        assert_eq!(model.classes(), &[Label::Fake, Label::Real]);
        assert_eq!(model.class_count(), &[2, 2]);
    }

    #[test]
    fn predicts_by_discriminative_feature() {
        let model = toy_model();
        let real = model.posterior(&vector(&[(0, 1.0)])).expect("posterior");
        assert_eq!(real.label, Label::Real);
        assert!(real.max_probability() > 0.5);

        let fake = model.predict(&vector(&[(1, 1.0)])).expect("predict");
        assert_eq!(fake, Label::Fake);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = toy_model();
        let proba = model
            .predict_proba(&vector(&[(0, 0.5), (1, 0.5)]))
            .expect("proba");
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_vector_falls_back_to_priors() {
        let model = toy_model();
        let posterior = model.posterior(&SparseVector::default()).expect("posterior");
        // equal priors tie, first class wins
        assert_eq!(posterior.label, Label::Fake);
        assert!((posterior.max_probability() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_feature_is_an_error() {
        let model = toy_model();
        assert_eq!(
            model.posterior(&vector(&[(7, 1.0)])).unwrap_err(),
            ModelError::DimensionMismatch {
                index: 7,
                dimension: 3
            }
        );
    }

    #[test]
    fn saved_state_round_trips() {
        let model = toy_model();
        let json = serde_json::to_string(&model).expect("serialize");
        let restored: NaiveBayesModel = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, model);
    }

    #[test]
    fn malformed_state_is_rejected() {
        let mut state = serde_json::to_value(toy_model()).expect("serialize");
        state["feature_log_prob"][1] = serde_json::json!([-1.0]);
        let error = serde_json::from_value::<NaiveBayesModel>(state.clone()).unwrap_err();
        assert!(error.to_string().contains("row 1 has 1 weights"), "{error}");

        state["feature_log_prob"] = serde_json::json!([[-1.0, -1.0, -1.0]]);
        assert!(serde_json::from_value::<NaiveBayesModel>(state.clone()).is_err());

        state["classes"] = serde_json::json!([]);
        assert!(serde_json::from_value::<NaiveBayesModel>(state).is_err());
    }

    #[test]
    fn fit_validates_inputs() {
        assert_eq!(
            NaiveBayesModel::fit(&[], &[], 3, 1.0).unwrap_err(),
            ModelError::EmptyTrainingSet
        );
        assert!(matches!(
            NaiveBayesModel::fit(&[SparseVector::default()], &[], 3, 1.0),
            Err(ModelError::LengthMismatch { .. })
        ));
        assert!(matches!(
            NaiveBayesModel::fit(&[SparseVector::default()], &[Label::Real], 3, 0.0),
            Err(ModelError::InvalidAlpha(_))
        ));
    }
}
