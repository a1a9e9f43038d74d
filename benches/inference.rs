/// 推論ホットパス（ベクトル化 + 事後確率）のベンチマーク。
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fake_news_detector::classification::{
    ArtifactPair, DEFAULT_ALPHA, Label, NaiveBayesModel, TfidfVectorizer, VectorizerOptions,
};
use fake_news_detector::inference::Predictor;

const REAL_WORDS: [&str; 8] = [
    "nasa", "telescope", "orbit", "mission", "agency", "research", "satellite", "study",
];
const FAKE_WORDS: [&str; 8] = [
    "microchip", "hoax", "secret", "cabal", "elites", "plot", "tracking", "exposed",
];

fn synthetic_articles(words: &[&str], count: usize, length: usize) -> Vec<String> {
    (0..count)
        .map(|idx| {
            (0..length)
                .map(|offset| words[(idx * 3 + offset * 5) % words.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn trained_pair() -> ArtifactPair {
    let real = synthetic_articles(&REAL_WORDS, 200, 40);
    let fake = synthetic_articles(&FAKE_WORDS, 200, 40);
    let labels: Vec<Label> = std::iter::repeat_n(Label::Real, real.len())
        .chain(std::iter::repeat_n(Label::Fake, fake.len()))
        .collect();
    let texts: Vec<String> = real.into_iter().chain(fake).collect();
    let vectorizer =
        TfidfVectorizer::fit(&texts, VectorizerOptions::default()).expect("fit vectorizer");
    let features = vectorizer.transform_batch(&texts);
    let model = NaiveBayesModel::fit(&features, &labels, vectorizer.vocabulary_size(), DEFAULT_ALPHA)
        .expect("fit model");
    ArtifactPair::new(vectorizer, model).expect("pair")
}

fn bench_single_prediction(c: &mut Criterion) {
    let predictor = Predictor::new(Arc::new(trained_pair()), 0);
    let article = synthetic_articles(&REAL_WORDS, 1, 400).remove(0);

    c.bench_function("predict_uncached_400_words", |b| {
        b.iter(|| black_box(predictor.predict(black_box(&article))));
    });

    let cached = Predictor::new(Arc::new(trained_pair()), 1024);
    c.bench_function("predict_cached_400_words", |b| {
        b.iter(|| black_box(cached.predict(black_box(&article))));
    });
}

fn bench_batch_prediction(c: &mut Criterion) {
    let predictor = Predictor::new(Arc::new(trained_pair()), 0);
    let mut group = c.benchmark_group("predict_batch");
    for rows in [10_usize, 100, 1000] {
        let texts = synthetic_articles(&FAKE_WORDS, rows, 80);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &texts, |b, texts| {
            b.iter(|| black_box(predictor.predict_batch(texts).len()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_prediction, bench_batch_prediction);
criterion_main!(benches);
