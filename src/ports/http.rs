use async_trait::async_trait;

use crate::domain::{RequestDescriptor, RequestFailure, RequestPolicy, ResponseEnvelope};

/// HTTP client port for all backend requests.
///
/// One call is one logical request: implementations apply origin prefixing,
/// retry and deadline from `policy` and resolve to either a 2xx response or
/// a normalized failure.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        request: RequestDescriptor,
        policy: &RequestPolicy,
    ) -> Result<ResponseEnvelope, RequestFailure>;

    /// Origin relative paths are resolved against.
    fn origin(&self) -> &str;
}
