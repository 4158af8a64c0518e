use crate::aggregate::error::AggregateError;
use crate::fetch::error::FetchError;
use thiserror::Error;

/// Any failure of the crate, for callers that run both the fetch and the aggregation.
#[derive(Debug, Error)]
pub enum Era5Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}
