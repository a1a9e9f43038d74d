//! 固定シードの学習/評価分割。
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("test fraction must be within (0, 1), got {0}")]
    InvalidFraction(f64),
    #[error("{total} samples cannot be split into non-empty train and test sets")]
    TooFewSamples { total: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// 要素を並べ替え、先頭 `ceil(n * test_fraction)` 件を評価用にする。
///
/// # Errors
/// 割合が範囲外、またはどちらかが空になる場合。
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn train_test_split<T>(
    items: Vec<T>,
    test_fraction: f64,
    seed: u64,
) -> Result<Split<T>, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }
    let total = items.len();
    let n_test = (test_fraction * total as f64).ceil() as usize;
    if n_test == 0 || n_test >= total {
        return Err(SplitError::TooFewSamples { total });
    }

    let mut order: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut take = |idx: &usize| slots[*idx].take();
    let test = order[..n_test].iter().filter_map(&mut take).collect();
    let train = order[n_test..].iter().filter_map(&mut take).collect();

    Ok(Split { train, test })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(10, 2, 8)]
    #[case(11, 3, 8)]
    #[case(5, 1, 4)]
    fn sizes_follow_ceiling_rule(
        #[case] total: usize,
        #[case] expected_test: usize,
        #[case] expected_train: usize,
    ) {
        let split = train_test_split((0..total).collect(), 0.2, 42).expect("split");
        assert_eq!(split.test.len(), expected_test);
        assert_eq!(split.train.len(), expected_train);
    }

    #[test]
    fn split_is_a_partition() {
        let split = train_test_split((0..50).collect::<Vec<_>>(), 0.2, 7).expect("split");
        let mut all: Vec<_> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_membership() {
        let a = train_test_split((0..100).collect::<Vec<_>>(), 0.2, 42).expect("split");
        let b = train_test_split((0..100).collect::<Vec<_>>(), 0.2, 42).expect("split");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert_eq!(
            train_test_split(vec![1], 0.2, 42).unwrap_err(),
            SplitError::TooFewSamples { total: 1 }
        );
        assert!(matches!(
            train_test_split(vec![1, 2, 3], 1.5, 42),
            Err(SplitError::InvalidFraction(_))
        ));
    }
}
