use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metadata service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Metadata service error: {0}")]
    Api(String),

    #[error("Invalid response from metadata service: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
