use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

const BOT_TOKEN_HEADER: &str = "X-Bot-Token";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{method} {path}: backend unreachable: {source}")]
    Transport {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {path}: backend answered {status}")]
    Status {
        method: &'static str,
        path: String,
        status: StatusCode,
    },
    #[error("{method} {path}: unexpected response body: {source}")]
    Decode {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Client for the backend that owns users, balances, ledger and rates.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/bot{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let request = self.client.get(self.url(path));
        self.send("GET", path, request).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let request = self.client.post(self.url(path)).json(body);
        self.send("POST", path, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = request
            .header(BOT_TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                method,
                path: path.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                method,
                path: path.to_string(),
                status,
            });
        }

        resp.json().await.map_err(|source| BackendError::Decode {
            method,
            path: path.to_string(),
            source,
        })
    }
}

/// Backend and upstream APIs send numbers either as JSON strings or numbers.
pub fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
