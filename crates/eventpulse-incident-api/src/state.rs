use eventpulse_storage::IncidentStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<IncidentStore>,
    pub ready: bool,
}
