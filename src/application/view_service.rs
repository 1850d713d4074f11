// View service - Registry of open views
use crate::application::chart_surface::ChartSurface;
use crate::application::data_source::SensorDataSource;
use crate::application::error::ViewError;
use crate::application::style_registry::StyleRegistry;
use crate::application::view_session::ViewSession;
use crate::domain::fridge::{FridgeRef, ViewMode};
use crate::infrastructure::config::ViewConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Builds the chart surface of a new view. The second value is handed back
/// to the caller, e.g. the receiving end of a command stream.
pub trait SurfaceFactory<T>: Send + Sync {
    fn create(&self, view_id: u64) -> (Arc<dyn ChartSurface>, T);
}

impl<T, F> SurfaceFactory<T> for F
where
    F: Fn(u64) -> (Arc<dyn ChartSurface>, T) + Send + Sync,
{
    fn create(&self, view_id: u64) -> (Arc<dyn ChartSurface>, T) {
        self(view_id)
    }
}

pub struct ViewService<T> {
    source: Arc<dyn SensorDataSource>,
    styles: Arc<StyleRegistry>,
    config: ViewConfig,
    surfaces: Box<dyn SurfaceFactory<T>>,
    next_id: AtomicU64,
    views: Mutex<HashMap<u64, OpenView<T>>>,
}

struct OpenView<T> {
    session: Arc<ViewSession>,
    attachment: Option<T>,
    opened: Instant,
}

impl<T: Send + 'static> ViewService<T> {
    pub fn new(
        source: Arc<dyn SensorDataSource>,
        styles: Arc<StyleRegistry>,
        config: ViewConfig,
        surfaces: impl SurfaceFactory<T> + 'static,
    ) -> Self {
        Self {
            source,
            styles,
            config,
            surfaces: Box::new(surfaces),
            next_id: AtomicU64::new(1),
            views: Mutex::new(HashMap::new()),
        }
    }

    /// Open a view and start loading its sensors and initial data.
    pub fn open(&self, fridge: FridgeRef, mode: ViewMode) -> Arc<ViewSession> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (surface, attachment) = self.surfaces.create(id);
        let session = ViewSession::new(
            id,
            fridge,
            mode,
            self.config.clone(),
            self.source.clone(),
            surface,
            self.styles.clone(),
        );

        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                OpenView {
                    session: session.clone(),
                    attachment: Some(attachment),
                    opened: Instant::now(),
                },
            );
        session.enter();
        tracing::info!("Opened view {} ({:?})", id, mode);
        session
    }

    pub fn get(&self, id: u64) -> Result<Arc<ViewSession>, ViewError> {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|view| view.session.clone())
            .ok_or(ViewError::ViewNotFound(id))
    }

    /// Hand out the view's attachment. Only the first caller gets it.
    pub fn take_attachment(&self, id: u64) -> Result<T, ViewError> {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        let view = views.get_mut(&id).ok_or(ViewError::ViewNotFound(id))?;
        view.attachment.take().ok_or(ViewError::StreamTaken)
    }

    /// Tear the view down and forget it. Returns the number of aborted requests.
    pub fn close(&self, id: u64) -> Result<usize, ViewError> {
        let view = self
            .views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(ViewError::ViewNotFound(id))?;
        Ok(view.session.teardown())
    }

    /// Close views whose attachment nobody took within `max_age`.
    pub fn close_unattached(&self, max_age: Duration) -> usize {
        let stale: Vec<OpenView<T>> = {
            let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
            let ids: Vec<u64> = views
                .iter()
                .filter(|(_, view)| view.attachment.is_some() && view.opened.elapsed() >= max_age)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| views.remove(id)).collect()
        };

        for view in &stale {
            tracing::info!("Closing view {}: event stream never opened", view.session.id());
            view.session.teardown();
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.views.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chart_surface::recording::RecordingSurface;
    use crate::application::fake_source::FakeSource;
    use crate::domain::sensor::Sensor;
    use crate::domain::telemetry::BulkData;

    fn service() -> ViewService<&'static str> {
        let source = FakeSource::new(vec![Sensor::new("mc", "MC")], BulkData::default()).hanging();
        ViewService::new(
            Arc::new(source),
            Arc::new(StyleRegistry::default()),
            ViewConfig::default(),
            |_id: u64| {
                let surface: Arc<dyn ChartSurface> = Arc::new(RecordingSurface::new());
                (surface, "events")
            },
        )
    }

    #[tokio::test]
    async fn test_open_get_close() {
        let service = service();
        let first = service.open(FridgeRef::new("Blue_Fridge", None), ViewMode::Live);
        let second = service.open(
            FridgeRef::new("Blue_Fridge", Some("he3".into())),
            ViewMode::Historic,
        );
        assert_ne!(first.id(), second.id());
        assert_eq!(service.len(), 2);
        assert_eq!(service.get(first.id()).unwrap().mode(), ViewMode::Live);

        assert_eq!(service.take_attachment(first.id()).unwrap(), "events");
        assert!(matches!(
            service.take_attachment(first.id()),
            Err(ViewError::StreamTaken)
        ));

        service.close(first.id()).unwrap();
        assert!(first.snapshot().closed);
        assert!(matches!(service.get(first.id()), Err(ViewError::ViewNotFound(_))));
        assert!(matches!(service.close(first.id()), Err(ViewError::ViewNotFound(_))));
        assert_eq!(service.len(), 1);
        service.close(second.id()).unwrap();
    }

    #[tokio::test]
    async fn test_unattached_views_are_reaped() {
        let service = service();
        let watched = service.open(FridgeRef::new("Red_Fridge", None), ViewMode::Live);
        let abandoned = service.open(FridgeRef::new("Green_Fridge", None), ViewMode::Live);
        service.take_attachment(watched.id()).unwrap();

        assert_eq!(service.close_unattached(Duration::from_secs(3600)), 0);
        assert_eq!(service.close_unattached(Duration::ZERO), 1);
        assert!(abandoned.snapshot().closed);
        assert!(matches!(service.get(abandoned.id()), Err(ViewError::ViewNotFound(_))));
        assert!(!watched.snapshot().closed);
        assert_eq!(service.len(), 1);
        service.close(watched.id()).unwrap();
    }
}
