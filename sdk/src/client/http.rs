//! HTTP client implementation.
//!
//! Provides the reqwest-backed [`ApiLayer`] for the console's REST API.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::api::ApiLayer;
use super::config::ClientConfig;
use super::error::ClientError;
use crate::token::TokenStore;
use crate::types::{
    ChannelName, Company, Invitation, Permission, Profile, Role, User, Warehouse, Wms,
};

#[derive(Debug, Deserialize)]
struct MeResponse {
    me: Profile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyCompanyResponse {
    my_company: Company,
}

#[derive(Debug, Deserialize)]
struct WarehousesResponse {
    warehouses: Vec<Warehouse>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyWmsResponse {
    my_wms: Wms,
}

#[derive(Debug, Deserialize)]
struct RolesResponse {
    roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
struct PermissionsResponse {
    permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize)]
struct InvitationsResponse {
    invitations: Vec<Invitation>,
}

/// Control-plane acknowledgement; the body carries nothing the client needs.
#[derive(Debug, Deserialize)]
struct Ack {}

#[derive(Debug, Serialize)]
struct ChannelRequest<'a> {
    channel: &'a ChannelName,
}

/// HTTP client for the console's REST API.
#[derive(Clone)]
pub struct WmsClient {
    config: ClientConfig,
    http: reqwest::Client,
    tokens: Arc<dyn TokenStore>,
}

impl fmt::Debug for WmsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WmsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WmsClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            config,
            http,
            tokens,
        })
    }

    /// Creates a new client with the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_base_url(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, ClientError> {
        Self::new(ClientConfig::new(base_url), tokens)
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn bearer(&self) -> Result<String, ClientError> {
        self.tokens
            .access_token()
            .map(|token| format!("Bearer {}", token))
            .ok_or(ClientError::Unauthorized)
    }

    /// Makes an authenticated GET request to the given path.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.config.endpoint(path);
        let bearer = self.bearer()?;
        self.request_with_retry(path, || {
            self.http.get(&url).header(AUTHORIZATION, &bearer)
        })
        .await
    }

    /// Makes an authenticated POST request with a JSON body.
    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.config.endpoint(path);
        let bearer = self.bearer()?;
        self.request_with_retry(path, || {
            self.http
                .post(&url)
                .header(AUTHORIZATION, &bearer)
                .json(body)
        })
        .await
    }

    /// Sends a request, retrying rate-limited and timed-out attempts up to
    /// `max_retries` times.
    async fn request_with_retry<T, F>(&self, path: &str, request_fn: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let outcome = match request_fn().send().await {
                Ok(response) => read_response(path, response).await,
                Err(e) => Err(ClientError::transport(path, e)),
            };
            match outcome {
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let wait = err.retry_delay(attempt);
                    debug!("{}; retry {} in {:?}", err, attempt, wait);
                    tokio::time::sleep(wait).await;
                }
                other => return other,
            }
        }
    }
}

/// Reads a response body and decodes it, or classifies the failure.
async fn read_response<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_secs);
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::transport(path, e))?;

    if !status.is_success() {
        return Err(ClientError::from_status(path, status, retry_after, &body));
    }
    decode_body(path, &body)
}

/// Decodes a 2xx body; an empty body decodes as an empty object.
fn decode_body<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ClientError> {
    let body = if body.trim().is_empty() { "{}" } else { body };
    serde_json::from_str(body).map_err(|e| ClientError::Deserialization {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ApiLayer for WmsClient {
    async fn fetch_me(&self) -> Result<Profile, ClientError> {
        let response: MeResponse = self.get("/me").await?;
        Ok(response.me)
    }

    async fn fetch_company(&self, company_id: &str) -> Result<Company, ClientError> {
        let response: MyCompanyResponse = self
            .get(&format!("/companies/{}", urlencoding::encode(company_id)))
            .await?;
        Ok(response.my_company)
    }

    async fn fetch_company_warehouses(
        &self,
        company_id: &str,
    ) -> Result<Vec<Warehouse>, ClientError> {
        let response: WarehousesResponse = self
            .get(&format!(
                "/companies/{}/warehouses",
                urlencoding::encode(company_id)
            ))
            .await?;
        Ok(response.warehouses)
    }

    async fn fetch_company_users(&self, company_id: &str) -> Result<Vec<User>, ClientError> {
        let response: UsersResponse = self
            .get(&format!("/companies/{}/users", urlencoding::encode(company_id)))
            .await?;
        Ok(response.users)
    }

    async fn fetch_wms(&self, wms_id: &str) -> Result<Wms, ClientError> {
        let response: MyWmsResponse = self
            .get(&format!("/wms/{}", urlencoding::encode(wms_id)))
            .await?;
        Ok(response.my_wms)
    }

    async fn fetch_wms_users(&self, wms_id: &str) -> Result<Vec<User>, ClientError> {
        let response: UsersResponse = self
            .get(&format!("/wms/{}/users", urlencoding::encode(wms_id)))
            .await?;
        Ok(response.users)
    }

    async fn fetch_wms_roles(&self, wms_id: &str) -> Result<Vec<Role>, ClientError> {
        let response: RolesResponse = self
            .get(&format!("/wms/{}/roles", urlencoding::encode(wms_id)))
            .await?;
        Ok(response.roles)
    }

    async fn fetch_wms_permissions(&self, wms_id: &str) -> Result<Vec<Permission>, ClientError> {
        let response: PermissionsResponse = self
            .get(&format!("/wms/{}/permissions", urlencoding::encode(wms_id)))
            .await?;
        Ok(response.permissions)
    }

    async fn fetch_wms_invitations(&self, wms_id: &str) -> Result<Vec<Invitation>, ClientError> {
        let response: InvitationsResponse = self
            .get(&format!("/wms/{}/invitations", urlencoding::encode(wms_id)))
            .await?;
        Ok(response.invitations)
    }

    async fn subscribe_channel(&self, channel: &ChannelName) -> Result<(), ClientError> {
        let _: Ack = self
            .post("/realtime/subscribe", &ChannelRequest { channel })
            .await?;
        Ok(())
    }

    async fn unsubscribe_channel(&self, channel: &ChannelName) -> Result<(), ClientError> {
        let _: Ack = self
            .post("/realtime/unsubscribe", &ChannelRequest { channel })
            .await?;
        Ok(())
    }
}
