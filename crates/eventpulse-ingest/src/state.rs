use eventpulse_broker::Publisher;
use eventpulse_storage::IngestStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<IngestStore>,
    pub publisher: Arc<Publisher>,
    pub topic_alert_raised: String,
    pub ready: bool,
}
