use std::sync::Arc;

use service::measure::MeasureService;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct ServerState {
    pub measures: Arc<MeasureService>,
}

impl ServerState {
    pub fn new(measures: MeasureService) -> Self {
        Self { measures: Arc::new(measures) }
    }
}
