// # NSoT Inventory Client
//
// This crate provides the NSoT REST implementation of `InventoryClient`.
//
// ## Behavior
//
// - ✅ One HTTP request per engine call (plus one authentication request
//   whose outcome, success or failure, is cached for the life of the client)
// - ✅ An accepted write with an empty body is still a success
// - ✅ Every failure mapped onto `Connectivity`, `Rejected` or `Unexpected`
// - ✅ Request timeout from configuration (default 30 seconds)
// - ✅ Plain-array and enveloped (`{"data": ...}`, `{"results": ...}`) bodies
// - ❌ NO retry logic (a rejected write is abandoned by the engine)
// - ❌ NO create-or-update decisions (owned by the Reconciler)
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - The secret key and auth token NEVER appear in logs or Debug output
//
// ## API Reference
//
// - Authenticate: POST `/api/authenticate/` `{"email", "secret_key"}`
// - Lookup: GET `/api/sites/:site_id/:collection/?field=value`
// - Create: POST `/api/sites/:site_id/:collection/`
// - Update: PATCH `/api/sites/:site_id/:collection/:id/`

use async_trait::async_trait;
use nsot_sync_core::config::AuthMethod;
use nsot_sync_core::model::{Collection, Filter};
use nsot_sync_core::traits::{InventoryClient, InventoryClientFactory, RemoteRecord};
use nsot_sync_core::{DriverRegistry, Error, InventoryConfig, InventoryError, Result};
use reqwest::header::{AUTHORIZATION, LOCATION};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// NSoT inventory client
///
/// # Trust Level: Untrusted
///
/// The client is a transport adapter: it turns engine calls into HTTP
/// requests and responses into records or classified failures.
pub struct NsotClient {
    /// `<url>/api`, without a trailing slash
    api_base: String,

    email: String,

    /// ⚠️ NEVER log this value
    secret_key: Option<String>,

    auth_method: AuthMethod,

    /// Header carrying the email in `auth_header` mode
    auth_header: String,

    client: reqwest::Client,

    /// Outcome of the first authentication in `auth_token` mode, failure
    /// included, so a bad key is sent only once per client
    /// ⚠️ NEVER log this value
    token: OnceCell<std::result::Result<String, InventoryError>>,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for NsotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NsotClient")
            .field("api_base", &self.api_base)
            .field("email", &self.email)
            .field("secret_key", &"<REDACTED>")
            .field("auth_method", &self.auth_method)
            .field("auth_header", &self.auth_header)
            .finish()
    }
}

impl NsotClient {
    /// Create a client from an `nsot` inventory configuration
    ///
    /// The configuration is validated first; an invalid one never produces
    /// a client.
    pub fn from_config(config: &InventoryConfig) -> Result<Self> {
        config.validate()?;

        let InventoryConfig::Nsot {
            url,
            email,
            secret_key,
            auth_method,
            auth_header,
            timeout_secs,
        } = config
        else {
            return Err(Error::config("Invalid config for NSoT client"));
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(*timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base: format!("{}/api", url.trim_end_matches('/')),
            email: email.clone(),
            secret_key: secret_key.clone(),
            auth_method: *auth_method,
            auth_header: auth_header.clone(),
            client,
            token: OnceCell::new(),
        })
    }

    fn collection_url(&self, site_id: u64, collection: Collection) -> String {
        format!("{}/sites/{}/{}/", self.api_base, site_id, collection)
    }

    fn resource_url(&self, site_id: u64, collection: Collection, id: u64) -> String {
        format!("{}/sites/{}/{}/{}/", self.api_base, site_id, collection, id)
    }

    /// Attach credentials for the configured auth method
    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<reqwest::RequestBuilder, InventoryError> {
        match self.auth_method {
            AuthMethod::AuthHeader => Ok(request.header(self.auth_header.as_str(), &self.email)),
            AuthMethod::AuthToken => {
                let token = self
                    .token
                    .get_or_init(|| self.authenticate())
                    .await
                    .as_ref()
                    .map_err(Clone::clone)?;
                Ok(request.header(AUTHORIZATION, format!("AuthToken {}:{}", self.email, token)))
            }
        }
    }

    /// Exchange email and secret key for an auth token
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /api/authenticate/
    /// {"email": "...", "secret_key": "..."}
    /// ```
    async fn authenticate(&self) -> std::result::Result<String, InventoryError> {
        debug!("Authenticating to NSoT as {}", self.email);

        let request = self
            .client
            .post(format!("{}/authenticate/", self.api_base))
            .json(&json!({
                "email": self.email,
                "secret_key": self.secret_key.as_deref().unwrap_or_default(),
            }));
        let body = self.send(request).await?;

        body.get("auth_token")
            .or_else(|| body.pointer("/data/auth_token"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| InventoryError::unexpected("authentication response without auth_token"))
    }

    /// Send a request and decode its JSON body
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Value, InventoryError> {
        Ok(self.exchange(request).await?.body)
    }

    /// Send a request and decode the reply
    ///
    /// - connect/timeout failures → `Connectivity`
    /// - non-2xx → `Rejected` with the JSON body, or the raw text
    /// - 2xx with an empty body → `Null`
    /// - 2xx with an undecodable body → `Unexpected`
    async fn exchange(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Reply, InventoryError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let location_id = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .and_then(id_from_location);
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let payload =
                serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));
            return Err(InventoryError::rejected(status.as_u16(), payload));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| InventoryError::unexpected(format!("Failed to parse response: {e}")))?
        };
        Ok(Reply { body, location_id })
    }
}

/// A decoded 2xx response
struct Reply {
    body: Value,
    /// Trailing id of the `Location` header, if any
    location_id: Option<u64>,
}

/// `/api/sites/1/devices/12/` → `12`
fn id_from_location(location: &str) -> Option<u64> {
    location.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn transport_error(err: reqwest::Error) -> InventoryError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        InventoryError::connectivity(err.to_string())
    } else {
        InventoryError::unexpected(err.to_string())
    }
}

/// Pull the list of records out of a lookup response
///
/// Accepts a bare array, `{"data": {"<collection>": [...]}}`,
/// `{"data": [...]}` and `{"results": [...]}`.
fn records_from_list(
    body: Value,
    collection: Collection,
) -> std::result::Result<Vec<RemoteRecord>, InventoryError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let list = match map.remove("data") {
                Some(Value::Object(mut data)) => data.remove(collection.as_str()),
                Some(list @ Value::Array(_)) => Some(list),
                _ => map.remove("results"),
            };
            match list {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(InventoryError::unexpected(format!(
                        "lookup response without a {collection} list"
                    )));
                }
            }
        }
        other => {
            return Err(InventoryError::unexpected(format!(
                "lookup response is not a list: {other}"
            )));
        }
    };

    items.into_iter().map(RemoteRecord::from_value).collect()
}

/// Pull the single record out of a create/update response
///
/// Accepts a bare object and `{"data": {"<noun>": {...}}}`.
fn record_from_single(
    body: Value,
    collection: Collection,
) -> std::result::Result<RemoteRecord, InventoryError> {
    if body.get("id").is_some() {
        return RemoteRecord::from_value(body);
    }

    let nested = match body.get("data") {
        Some(data) if data.get("id").is_some() => Some(data.clone()),
        Some(data) => Some(data.get(collection.noun()).cloned().ok_or_else(|| {
            InventoryError::unexpected(format!(
                "write response without a {} record",
                collection.noun()
            ))
        })?),
        None => None,
    };

    RemoteRecord::from_value(nested.unwrap_or(body))
}

/// Record for an accepted write
///
/// An empty body still means the write was accepted: the record is the
/// request body under the known id, or the id from `Location`.
fn written_record(
    reply: Reply,
    collection: Collection,
    request: &Value,
    known_id: Option<u64>,
) -> std::result::Result<RemoteRecord, InventoryError> {
    if !reply.body.is_null() {
        return record_from_single(reply.body, collection);
    }

    let id = known_id.or(reply.location_id).ok_or_else(|| {
        InventoryError::unexpected(format!(
            "{} write accepted without a record or Location header",
            collection.noun()
        ))
    })?;
    let mut fields = request.clone();
    if let Some(map) = fields.as_object_mut() {
        map.insert("id".to_string(), json!(id));
    }
    Ok(RemoteRecord { id, fields })
}

#[async_trait]
impl InventoryClient for NsotClient {
    /// # API Call
    ///
    /// ```http
    /// GET /api/sites/:site_id/:collection/?hostname=router1
    /// ```
    async fn lookup(
        &self,
        site_id: u64,
        collection: Collection,
        filter: &Filter,
    ) -> std::result::Result<Vec<RemoteRecord>, InventoryError> {
        debug!("GET {} {:?}", self.collection_url(site_id, collection), filter);

        let request = self
            .client
            .get(self.collection_url(site_id, collection))
            .query(filter);
        let body = self.send(self.authorize(request).await?).await?;
        records_from_list(body, collection)
    }

    async fn create(
        &self,
        site_id: u64,
        collection: Collection,
        body: &Value,
    ) -> std::result::Result<RemoteRecord, InventoryError> {
        debug!("POST {}", self.collection_url(site_id, collection));

        let request = self
            .client
            .post(self.collection_url(site_id, collection))
            .json(body);
        let reply = self.exchange(self.authorize(request).await?).await?;
        let record = written_record(reply, collection, body, None)?;

        info!("Created {} {} in site {}", collection.noun(), record.id, site_id);
        Ok(record)
    }

    async fn update(
        &self,
        site_id: u64,
        collection: Collection,
        id: u64,
        body: &Value,
    ) -> std::result::Result<RemoteRecord, InventoryError> {
        debug!("PATCH {}", self.resource_url(site_id, collection, id));

        let request = self
            .client
            .patch(self.resource_url(site_id, collection, id))
            .json(body);
        let reply = self.exchange(self.authorize(request).await?).await?;
        let record = written_record(reply, collection, body, Some(id))?;

        info!("Updated {} {} in site {}", collection.noun(), record.id, site_id);
        Ok(record)
    }

    fn client_name(&self) -> &'static str {
        "nsot"
    }
}

/// Factory for creating NSoT clients
pub struct NsotFactory;

impl InventoryClientFactory for NsotFactory {
    fn create(&self, config: &InventoryConfig) -> Result<Box<dyn InventoryClient>> {
        match config {
            InventoryConfig::Nsot { .. } => Ok(Box::new(NsotClient::from_config(config)?)),
            _ => Err(Error::config("Invalid config for NSoT client")),
        }
    }
}

/// Register the NSoT client with a registry
///
/// # Example
///
/// ```rust
/// use nsot_sync_core::DriverRegistry;
///
/// let registry = DriverRegistry::new();
/// nsot_sync_client::register(&registry);
/// assert!(registry.has_inventory("nsot"));
/// ```
pub fn register(registry: &DriverRegistry) {
    registry.register_inventory("nsot", Box::new(NsotFactory));
}
