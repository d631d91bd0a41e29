use thiserror::Error;

#[derive(Error, Debug)]
pub enum VenueError {
    #[error("Execution backend error: {0}")]
    Backend(String),

    #[error("Price feed error: {0}")]
    PriceFeed(String),

    #[error("Prediction source error: {0}")]
    Predictions(String),

    #[error("Agent pool error: {0}")]
    AgentPool(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Store error: {0}")]
    Store(#[from] venue_store::StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
