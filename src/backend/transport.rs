//! Transport seam for remote procedure calls.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use super::api_types::RpcReply;
use super::error::BackendError;

/// Carries a single remote procedure call to the backend.
///
/// `args` is always a JSON array of positional arguments.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn call(&self, method: &str, args: Value) -> Result<Value, BackendError>;
}

/// HTTP transport: `POST {base}/rpc/{method}` with a bearer identity token.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
  identity: String,
}

impl HttpTransport {
  pub fn new(base_url: &str, identity: String) -> Result<Self, BackendError> {
    let mut base =
      Url::parse(base_url).map_err(|e| BackendError::Transport(format!("invalid URL: {}", e)))?;

    // Url::join replaces the last segment unless the path ends with '/'
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| BackendError::Transport(e.to_string()))?;

    Ok(Self {
      client,
      base,
      identity,
    })
  }

  fn endpoint(&self, method: &str) -> Result<Url, BackendError> {
    self
      .base
      .join(&format!("rpc/{}", method))
      .map_err(|e| BackendError::Transport(format!("invalid endpoint for {}: {}", method, e)))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn call(&self, method: &str, args: Value) -> Result<Value, BackendError> {
    let url = self.endpoint(method)?;

    let response = self
      .client
      .post(url)
      .bearer_auth(&self.identity)
      .json(&args)
      .send()
      .await
      .map_err(|e| BackendError::Transport(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      return Err(BackendError::Rejected(format!("Unauthorized: {}", method)));
    }
    if !status.is_success() {
      return Err(BackendError::Transport(format!("{} returned {}", method, status)));
    }

    let reply: RpcReply = response.json().await.map_err(|e| BackendError::Decode {
      method: method.to_string(),
      message: e.to_string(),
    })?;

    match reply {
      RpcReply::Ok(value) => Ok(value),
      RpcReply::Err(message) => Err(BackendError::Rejected(message)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_endpoint_keeps_base_path() {
    let transport = HttpTransport::new("https://hr.example.com/api", "token".to_string()).unwrap();
    assert_eq!(
      transport.endpoint("getInviteCodes").unwrap().as_str(),
      "https://hr.example.com/api/rpc/getInviteCodes"
    );
  }

  #[test]
  fn test_endpoint_at_root() {
    let transport = HttpTransport::new("http://localhost:4943", "token".to_string()).unwrap();
    assert_eq!(
      transport.endpoint("isCallerAdmin").unwrap().as_str(),
      "http://localhost:4943/rpc/isCallerAdmin"
    );
  }

  #[test]
  fn test_invalid_url_is_transport_error() {
    assert!(matches!(
      HttpTransport::new("not a url", String::new()),
      Err(BackendError::Transport(_))
    ));
  }
}
