use crate::sender::{ClientError, EndpointError};
use thiserror::Error;

/// Fatal errors raised while constructing an adapter. Nothing after
/// construction is allowed to surface one of these.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Invalid backend address: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Backend client construction failed: {0}")]
    Client(#[from] ClientError),
}
