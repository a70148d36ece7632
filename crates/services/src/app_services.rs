use std::sync::Arc;

use storage::repository::Storage;
use tutor_core::LessonCatalog;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress_service::ProgressManager;

/// Assembles app-facing services over one catalog and one store.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<LessonCatalog>,
    progress: ProgressManager,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: LessonCatalog,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(&storage, clock, catalog))
    }

    /// Build services over the bundled course and an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the bundled course is invalid.
    pub fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        let catalog = LessonCatalog::builtin()?;
        Ok(Self::with_storage(&Storage::in_memory(), clock, catalog))
    }

    #[must_use]
    pub fn with_storage(storage: &Storage, clock: Clock, catalog: LessonCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let progress = ProgressManager::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&storage.progress),
        );
        Self { catalog, progress }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<LessonCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> ProgressManager {
        self.progress.clone()
    }
}
