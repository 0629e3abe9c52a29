use std::sync::Arc;

use crate::application::services::MessagingService;
use crate::presentation::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub messaging_service: Arc<MessagingService>,
    pub settings: Settings,
}
