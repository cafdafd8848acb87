use serde::Deserialize;
use tracing::{debug, info};

use super::ApiClient;
use crate::domain::speech::VoiceListResponse;
use crate::domain::{
    DomainError, Language, LanguageList, Operation, RequestDescriptor, Voice,
};

/// Statuses meaning the backend simply has no languages route yet.
const MISSING_ROUTE: [u16; 3] = [404, 405, 501];

#[derive(Deserialize)]
#[serde(untagged)]
enum LanguageListResponse {
    Wrapped(LanguageList),
    Bare(Vec<Language>),
}

impl ApiClient {
    /// List the voices available for synthesis.
    pub async fn voices(&self) -> Result<Vec<Voice>, DomainError> {
        let path = self.path(Operation::Voices)?;
        let response = self.send(RequestDescriptor::get(path), &self.policy).await?;

        let voices = response.json::<VoiceListResponse>()?.into_voices();
        info!(count = voices.len(), "Voices loaded");
        Ok(voices)
    }

    /// List transcription languages.
    ///
    /// Falls back to the built-in table when the backend has no languages
    /// route. Any other failure is returned.
    pub async fn languages(&self) -> Result<LanguageList, DomainError> {
        let Some(path) = self.endpoints.path(Operation::Languages) else {
            debug!(scheme = %self.endpoints.scheme, "No languages route, using built-in list");
            return Ok(LanguageList::fallback());
        };

        // A missing route will not appear on retry.
        let policy = self.policy.clone().with_retries(0);
        match self.send(RequestDescriptor::get(path), &policy).await {
            Ok(response) => {
                let list = match response.json::<LanguageListResponse>()? {
                    LanguageListResponse::Wrapped(list) => list,
                    LanguageListResponse::Bare(languages) => LanguageList {
                        languages,
                        default: None,
                        fallback: false,
                    },
                };
                info!(count = list.languages.len(), "Languages loaded");
                Ok(list)
            }
            Err(DomainError::Request(failure))
                if failure
                    .status()
                    .is_some_and(|status| MISSING_ROUTE.contains(&status)) =>
            {
                info!(status = ?failure.status(), "Languages route unavailable, using built-in list");
                Ok(LanguageList::fallback())
            }
            Err(e) => Err(e),
        }
    }
}
