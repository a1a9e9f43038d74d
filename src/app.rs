use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::{
    acquisition::{ArticleFetcher, ArticleSource},
    api,
    classification::ArtifactPair,
    config::Config,
    inference::Predictor,
    observability::Telemetry,
    session::SessionStore,
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    predictor: Arc<Predictor>,
    article_source: Arc<dyn ArticleSource>,
    sessions: Arc<SessionStore>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn predictor(&self) -> &Predictor {
        &self.registry.predictor
    }

    /// ブロッキングスレッドへ持ち出すための共有ハンドル。
    pub(crate) fn predictor_handle(&self) -> Arc<Predictor> {
        Arc::clone(&self.registry.predictor)
    }

    pub(crate) fn article_source(&self) -> Arc<dyn ArticleSource> {
        Arc::clone(&self.registry.article_source)
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.registry.sessions
    }
}

impl ComponentRegistry {
    /// 成果物ペアを読み込み、共有レジストリを構築する。
    ///
    /// 成果物が無い・壊れている・別々の学習実行のものである場合は起動させない。
    ///
    /// # Errors
    /// Telemetry の初期化、成果物の読み込み、HTTP クライアント構築が失敗した場合。
    pub fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        let pair = ArtifactPair::load(config.model_path(), config.vectorizer_path())
            .context("failed to load model and vectorizer artifacts")?;
        info!(
            run_id = %pair.run_id(),
            created_at = %pair.created_at(),
            vocabulary = pair.vectorizer().vocabulary_size(),
            "artifact pair loaded"
        );
        let fetcher = ArticleFetcher::new(config.fetch_connect_timeout(), config.fetch_total_timeout())?;
        Ok(Self::from_parts(config, telemetry, pair, Arc::new(fetcher)))
    }

    /// 読み込み済みの部品から組み立てる。
    #[must_use]
    pub fn from_parts(
        config: Config,
        telemetry: Telemetry,
        pair: ArtifactPair,
        article_source: Arc<dyn ArticleSource>,
    ) -> Self {
        let predictor = Predictor::new(Arc::new(pair), config.prediction_cache_capacity())
            .with_metrics(telemetry.metrics().clone());
        Self {
            config: Arc::new(config),
            telemetry,
            predictor: Arc::new(predictor),
            article_source,
            sessions: Arc::new(SessionStore::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}
