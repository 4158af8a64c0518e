use crate::fetch::error::FetchError;
use crate::types::request::RetrievalRequest;
use std::future::Future;
use std::path::Path;

/// A remote archive able to materialize one request as a local file.
///
/// [`crate::CdsClient`] is the production implementation; the fetcher only depends on
/// this one capability.
pub trait Retriever {
    /// Retrieves `request` from `dataset` and writes the result to `target`.
    ///
    /// Completes only once the file is fully written. Failures are returned as-is,
    /// nothing is retried.
    fn retrieve(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
        target: &Path,
    ) -> impl Future<Output = Result<(), FetchError>> + Send;
}
