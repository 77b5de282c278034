use ledger_core::{ChainResponse, PeerTransport, TransportError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches `GET http://{peer}/chain` with a per-request timeout.
#[derive(Clone, Debug)]
pub struct HttpPeerTransport {
    client: Client,
}

impl HttpPeerTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl PeerTransport for HttpPeerTransport {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, TransportError> {
        let url = format!("http://{peer}/chain");
        debug!(%url, "fetching peer chain");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| TransportError::Request {
                peer: peer.to_string(),
                reason: err.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json::<ChainResponse>()
            .await
            .map_err(|err| TransportError::Malformed {
                peer: peer.to_string(),
                reason: err.to_string(),
            })
    }
}
