//! Incident persistence over the Supabase REST API

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::SupabaseOptions;
use crate::error::{Error, Result};
use crate::models::{Candidate, Incident};

const INCIDENTS_TABLE: &str = "fire_incidents";
const INSERT_TIMEOUT_SECS: u64 = 30;

/// Backing store for approved incidents.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Insert one incident row. `None` means the repository is not
    /// configured and nothing was written.
    async fn insert_incident(&self, candidate: &Candidate, street: &str)
        -> Result<Option<Incident>>;
}

/// Supabase REST implementation.
///
/// The HTTP client carries the project credentials in default headers, so it
/// is built lazily on the first insert: the first caller constructs it, later
/// callers reuse the published instance.
pub struct SupabaseRepository {
    options: SupabaseOptions,
    http_client: OnceCell<reqwest::Client>,
}

impl SupabaseRepository {
    pub fn new(options: SupabaseOptions) -> Self {
        Self {
            options,
            http_client: OnceCell::new(),
        }
    }

    async fn client(&self, service_role_key: &str) -> Result<&reqwest::Client> {
        self.http_client
            .get_or_try_init(|| async {
                let mut headers = HeaderMap::new();
                let api_key = HeaderValue::from_str(service_role_key)
                    .map_err(|e| Error::Repository(format!("invalid service role key: {}", e)))?;
                let bearer =
                    HeaderValue::from_str(&format!("Bearer {}", service_role_key)).map_err(
                        |e| Error::Repository(format!("invalid service role key: {}", e)),
                    )?;
                headers.insert("apikey", api_key);
                headers.insert(AUTHORIZATION, bearer);

                let client = reqwest::Client::builder()
                    .default_headers(headers)
                    .timeout(std::time::Duration::from_secs(INSERT_TIMEOUT_SECS))
                    .build()?;
                Ok(client)
            })
            .await
    }

    fn resolve_photo_url(&self, candidate: &Candidate) -> String {
        if let Some(default) = self
            .options
            .default_photo_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        {
            return default.to_string();
        }

        candidate.link.clone()
    }
}

#[async_trait]
impl IncidentRepository for SupabaseRepository {
    async fn insert_incident(
        &self,
        candidate: &Candidate,
        street: &str,
    ) -> Result<Option<Incident>> {
        let (base_url, service_role_key) = match (
            self.options.url.as_deref().filter(|u| !u.trim().is_empty()),
            self.options
                .service_role_key
                .as_deref()
                .filter(|k| !k.trim().is_empty()),
        ) {
            (Some(url), Some(key)) => (url.trim_end_matches('/'), key.to_string()),
            _ => {
                warn!("Supabase is not configured, incident not inserted");
                return Ok(None);
            }
        };

        let row = Incident {
            id: None,
            datetime: candidate.published_at.unwrap_or_else(Utc::now),
            photo_url: self.resolve_photo_url(candidate),
            street: street.to_string(),
        };

        let client = self.client(&service_role_key).await?;
        let url = format!("{}/rest/v1/{}", base_url, INCIDENTS_TABLE);
        let response = client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&[&row])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Repository(format!(
                "insert failed with status {}: {}",
                status, body
            )));
        }

        let mut inserted: Vec<Incident> = response.json().await.map_err(|e| {
            Error::Repository(format!("insert response could not be parsed: {}", e))
        })?;

        let incident = if inserted.is_empty() {
            row
        } else {
            inserted.remove(0)
        };

        info!(candidate_id = %candidate.id, street = %incident.street, "Incident row inserted");
        Ok(Some(incident))
    }
}
