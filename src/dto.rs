use serde::Serialize;

/// `{"message": "..."}` body used by deletes, the welcome route and the 404 fallback.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}
