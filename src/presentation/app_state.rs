// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::view_service::ViewService;
use crate::infrastructure::event_surface::CommandReceiver;

pub struct AppState {
    pub dashboard_service: DashboardService,
    pub view_service: ViewService<CommandReceiver>,
}
