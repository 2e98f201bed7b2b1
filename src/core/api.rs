/// Off-chain API client
///
/// REST client for the group API service. All calls are JSON over HTTP and
/// carry the admin session cookie when one is configured.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::gateway::{AddMemberAck, GatewayError, GatewayResult, GroupApi};
use super::group::Group;

pub struct ApiClient {
    client: Client,
    base_url: Url,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, session_cookie: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid API URL '{}'", base_url))?;

        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("API URL must be an http(s) URL, got '{}'", base_url));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            session_cookie,
        })
    }

    /// `{base}/groups/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GatewayError::Transport("API URL cannot be a base".to_string()))?;
            path.pop_if_empty().push("groups").extend(segments);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.session_cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> GatewayResult<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::NOT_FOUND {
            Err(GatewayError::NotFound)
        } else {
            Err(GatewayError::Http(status.as_u16()))
        }
    }
}

#[async_trait]
impl GroupApi for ApiClient {
    async fn get_group(&self, id: &str) -> GatewayResult<Group> {
        let url = self.endpoint(&[id])?;
        debug!(%url, "GET group");

        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json::<Group>().await?)
    }

    async fn update_api_access(&self, id: &str, api_enabled: bool) -> GatewayResult<Group> {
        let url = self.endpoint(&[id])?;
        debug!(%url, api_enabled, "PATCH group");

        let request = self
            .request(Method::PATCH, url)
            .json(&json!({ "apiEnabled": api_enabled }));
        let response = self.send(request).await?;
        Ok(response.json::<Group>().await?)
    }

    async fn generate_api_key(&self, id: &str) -> GatewayResult<String> {
        let url = self.endpoint(&[id, "api-key"])?;
        debug!(%url, "PATCH api key");

        let response = self.send(self.request(Method::PATCH, url)).await?;
        let body = response.text().await?;
        parse_api_key(&body)
    }

    async fn add_member(&self, id: &str, member_id: &str) -> GatewayResult<AddMemberAck> {
        let url = self.endpoint(&[id, "members", member_id])?;
        debug!(%url, "POST member");

        let response = self.send(self.request(Method::POST, url)).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(AddMemberAck::Empty);
        }

        // The member is stored either way; an unreadable body only loses the echo
        match serde_json::from_str::<Group>(&body) {
            Ok(group) => Ok(AddMemberAck::Group(group)),
            Err(e) => {
                warn!(group_id = id, member_id, error = %e, "Unreadable add-member response, treating as empty");
                Ok(AddMemberAck::Empty)
            }
        }
    }

    async fn remove_member(&self, id: &str, member_id: &str) -> GatewayResult<()> {
        let url = self.endpoint(&[id, "members", member_id])?;
        debug!(%url, "DELETE member");

        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn remove_group(&self, id: &str) -> GatewayResult<()> {
        let url = self.endpoint(&[id])?;
        debug!(%url, "DELETE group");

        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

/// The key comes back either as a JSON string or as plain text
fn parse_api_key(body: &str) -> GatewayResult<String> {
    let key = match serde_json::from_str::<String>(body) {
        Ok(key) => key,
        Err(_) => body.trim().to_string(),
    };

    if key.is_empty() {
        return Err(GatewayError::Decode("empty API key".to_string()));
    }

    Ok(key)
}
