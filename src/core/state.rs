use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::plagiarism::SimilarityAnalyzer;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    analyzer: Arc<dyn SimilarityAnalyzer>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        analyzer: Arc<dyn SimilarityAnalyzer>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, analyzer }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn analyzer(&self) -> &dyn SimilarityAnalyzer {
        self.inner.analyzer.as_ref()
    }
}
