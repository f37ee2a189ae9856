use std::path::PathBuf;
use std::sync::Arc;

use configs::ApiConfig;
use service::Storage;

use crate::schema::RecordSchema;

/// Shared by every request for the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub schema: Arc<RecordSchema>,
    pub demo_data_file: Arc<PathBuf>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, api: &ApiConfig) -> Self {
        Self {
            storage,
            schema: Arc::new(RecordSchema::from_config(api)),
            demo_data_file: Arc::new(PathBuf::from(&api.demo_data_file)),
        }
    }
}
