use gt7_capture::{Delivery, LapRecord, LapSink, SinkError};

use crate::client::BackendClient;

/// Uploads each lap to the backend.
#[derive(Debug, Clone)]
pub struct RemoteSink {
    client: BackendClient,
}

impl RemoteSink {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

impl LapSink for RemoteSink {
    fn persist(&mut self, lap: &LapRecord) -> Result<Delivery, SinkError> {
        self.client
            .upload_lap(lap)
            .map(|endpoint| Delivery::Uploaded { endpoint })
            .map_err(|e| SinkError::Upload {
                lap_id: lap.lap_id.clone(),
                source: Box::new(e),
            })
    }
}
