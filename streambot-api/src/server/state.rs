// App state for the axum server
use std::sync::Arc;

use streambot_repository::SubscriptionService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SubscriptionService>,
}
