use serde_json::Value;
use tracing::{info, warn};

use super::ApiClient;
use crate::domain::{DomainError, Health, Liveness, Operation, RequestDescriptor};

impl ApiClient {
    /// Query backend liveness.
    ///
    /// A 2xx response is not enough on its own: the body must state the
    /// backend's status. Bodies without a liveness field yield
    /// `Liveness::Unknown`.
    pub async fn health(&self) -> Result<Health, DomainError> {
        let path = self.path(Operation::Health)?;
        let response = self.send(RequestDescriptor::get(path), &self.policy).await?;

        let raw = response.json_value();
        let liveness = Liveness::from_body(&raw);
        let version = raw
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);

        match liveness {
            Liveness::Unknown => {
                warn!(status = response.status, body = %raw, "Health response carries no liveness field")
            }
            _ => info!(liveness = ?liveness, version = ?version, "Backend health checked"),
        }

        Ok(Health {
            liveness,
            version,
            raw,
        })
    }
}
