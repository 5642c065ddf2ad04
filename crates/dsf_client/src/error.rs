use thiserror::Error;

#[derive(Debug, Error)]
pub enum DsfError {
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON from controller: {0}")]
    Json(#[from] serde_json::Error),
    #[error("controller closed the connection")]
    ConnectionClosed,
    #[error("incompatible API version: server speaks {server}, at least {required} is required")]
    IncompatibleVersion { server: u32, required: u32 },
    #[error("controller rejected the request: {error_type}: {message}")]
    Rejected { error_type: String, message: String },
    #[error("unexpected response from controller: {0}")]
    UnexpectedResponse(String),
}
