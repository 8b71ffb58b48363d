use std::sync::Arc;

use littleurl_core::LittleUrl;

#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn LittleUrl>,
}

impl AppState {
    pub fn new(service: Arc<dyn LittleUrl>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &dyn LittleUrl {
        self.service.as_ref()
    }
}
