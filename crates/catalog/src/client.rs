//! Catalog HTTP Client

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::model::{Course, StudentProgress};

/// Client for the hosted data API
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> CatalogResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// All catalog courses
    pub async fn courses(&self, access_token: Option<&str>) -> CatalogResult<Vec<Course>> {
        self.select("courses?select=*", access_token).await
    }

    /// Progress rows for one student
    pub async fn student_progress(
        &self,
        user_id: Uuid,
        access_token: Option<&str>,
    ) -> CatalogResult<Vec<StudentProgress>> {
        let path = format!("student_progress?user_id=eq.{user_id}&select=*");
        self.select(&path, access_token).await
    }

    async fn select<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: Option<&str>,
    ) -> CatalogResult<Vec<T>> {
        let url = format!("{}/rest/v1/{}", self.base_url, path);
        let mut request = self.http.get(&url).header("apikey", &self.api_key);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, url = %url, "Catalog query rejected");
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let rows = response.text().await?;
        serde_json::from_str(&rows).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}
