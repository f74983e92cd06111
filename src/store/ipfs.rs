use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use super::ContentStore;
use crate::config::IpfsConfig;

/// Talks to an IPFS node (or pinning service) over its HTTP RPC API.
pub struct IpfsStore {
    http: Client,
    config: IpfsConfig,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Error body of the RPC API.
#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(rename = "Message")]
    message: String,
}

/// Whether a failed `cat` means the handle names nothing, as opposed to the
/// node being unavailable. The RPC API reports bad or unknown paths as a 500
/// with a message body.
fn is_missing_content(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }

    let Ok(err) = serde_json::from_str::<RpcError>(body) else {
        return false;
    };
    let message = err.message.to_lowercase();
    ["invalid path", "invalid cid", "not found", "no link named"]
        .iter()
        .any(|needle| message.contains(needle))
}

impl IpfsStore {
    pub fn new(config: IpfsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build IPFS HTTP client")?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v0/{path}", self.config.api_url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.config.project_id, &self.config.project_secret) {
            (Some(id), Some(secret)) => req.basic_auth(id, Some(secret.expose_secret())),
            _ => req,
        }
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    async fn put(&self, record: &[u8]) -> Result<String> {
        let part = Part::bytes(record.to_vec())
            .file_name("settlement.json")
            .mime_str("application/json")?;
        let form = Form::new().part("file", part);

        let resp = self
            .authorize(self.http.post(self.endpoint("add")))
            .multipart(form)
            .send()
            .await
            .context("IPFS add request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("IPFS add returned {status}: {body}");
        }

        let added: AddResponse = resp.json().await.context("unexpected IPFS add response")?;
        debug!(cid = %added.hash, bytes = record.len(), "record pinned to IPFS");

        Ok(added.hash)
    }

    async fn get(&self, handle: &str) -> Result<Option<Vec<u8>>> {
        let resp = self
            .authorize(self.http.post(self.endpoint("cat")))
            .query(&[("arg", handle)])
            .send()
            .await
            .context("IPFS cat request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if is_missing_content(status, &body) {
                debug!(%handle, %status, "no IPFS content under handle");
                return Ok(None);
            }
            bail!("IPFS cat for {handle} returned {status}: {body}");
        }

        Ok(Some(resp.bytes().await.context("failed to read IPFS content")?.to_vec()))
    }

    fn name(&self) -> &str {
        "ipfs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn endpoints_hang_off_the_rpc_prefix() {
        let store = IpfsStore::new(IpfsConfig {
            api_url: "https://ipfs.example:5001".into(),
            project_id: None,
            project_secret: None,
        })
        .unwrap();

        assert_eq!(store.endpoint("add"), "https://ipfs.example:5001/api/v0/add");
    }

    #[test]
    fn add_response_reads_the_cid() {
        let body = r#"{"Name":"settlement.json","Hash":"QmYwAPJzv5CZsnAzt8auVZRn","Size":"123"}"#;
        let parsed: AddResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.hash, "QmYwAPJzv5CZsnAzt8auVZRn");
    }

    #[test]
    fn unknown_paths_are_missing_content() {
        let bad_cid = r#"{"Message":"invalid path \"deadbeef\": invalid cid: illegal base32 data at input byte 0","Code":0,"Type":"error"}"#;
        assert!(is_missing_content(StatusCode::INTERNAL_SERVER_ERROR, bad_cid));
        assert!(is_missing_content(StatusCode::NOT_FOUND, ""));
    }

    #[test]
    fn node_failures_are_not_missing_content() {
        let busy = r#"{"Message":"context deadline exceeded","Code":0,"Type":"error"}"#;
        assert!(!is_missing_content(StatusCode::INTERNAL_SERVER_ERROR, busy));
        assert!(!is_missing_content(StatusCode::BAD_GATEWAY, "<html>upstream down</html>"));
        assert!(!is_missing_content(StatusCode::UNAUTHORIZED, ""));
    }

    #[test]
    fn basic_auth_needs_both_halves() {
        let store = IpfsStore::new(IpfsConfig {
            api_url: "http://localhost:5001".into(),
            project_id: Some("id".into()),
            project_secret: Some(SecretString::new("secret".into())),
        })
        .unwrap();

        let req = store
            .authorize(store.http.post(store.endpoint("add")))
            .build()
            .unwrap();
        assert!(req.headers().contains_key(reqwest::header::AUTHORIZATION));
    }
}
