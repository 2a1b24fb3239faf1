//! Client error types.

use huobi_core::ChannelKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No {0} callback registered; set one before subscribing")]
    MissingCallback(ChannelKind),

    #[error("No tokio runtime available to run the connection task")]
    NoRuntime,

    #[error("Client has been shut down")]
    Closed,
}

pub type ClientResult<T> = Result<T, ClientError>;
