use std::sync::Arc;

use base64::Engine as _;
use url::Url;

use crate::{batch::Batch, codec::encode_batch, Config, SetupError, WriteError};

/// Delivers one batch to the remote store.
pub trait BatchWriter: Send + Sync {
    fn write(&self, batch: &Batch) -> Result<(), WriteError>;
}
impl<T> BatchWriter for Arc<T>
where
    T: BatchWriter + ?Sized,
{
    fn write(&self, batch: &Batch) -> Result<(), WriteError> {
        T::write(self, batch)
    }
}

/// Writes batches to the InfluxDB 1.x `/write` endpoint.
///
/// Credentials travel as HTTP Basic auth, never in the url, so they cannot
/// end up in transport errors or logs.
pub struct InfluxClient {
    client: ureq::Agent,
    host: Url,
    username: Option<String>,
    authorization: Option<String>,
}
impl InfluxClient {
    pub fn new(config: &Config) -> Result<Self, SetupError> {
        let host = config.host_url()?;
        let client = ureq::AgentBuilder::new()
            .timeout(config.write_timeout)
            .build();
        let authorization = config.username.as_ref().map(|username| {
            let password = config.password.as_deref().unwrap_or_default();
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{username}:{password}"));
            format!("Basic {token}")
        });
        Ok(Self {
            client,
            host,
            username: config.username.clone(),
            authorization,
        })
    }

    /// `{host}/write?db=..&precision=..`, keeping any path prefix on `host`.
    pub fn endpoint(&self, batch: &Batch) -> Url {
        let mut url = self.host.clone();
        let path = format!("{}/write", self.host.path().trim_end_matches('/'));
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("db", &batch.database)
            .append_pair("precision", batch.precision.as_str());
        url
    }
}
impl BatchWriter for InfluxClient {
    /// Blocking I/O
    fn write(&self, batch: &Batch) -> Result<(), WriteError> {
        let body = encode_batch(batch);
        let mut request = self
            .client
            .post(self.endpoint(batch).as_str())
            .set("Content-Type", "text/plain; charset=utf-8");
        if let Some(authorization) = &self.authorization {
            request = request.set("Authorization", authorization);
        }
        match request.send_bytes(&body) {
            Ok(_resp) => Ok(()),
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(WriteError::Status {
                    status,
                    body: body.trim().to_owned(),
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(WriteError::Transport(Box::new(transport)))
            }
        }
    }
}
impl core::fmt::Debug for InfluxClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InfluxClient")
            .field("host", &self.host.as_str())
            .field("username", &self.username)
            .finish()
    }
}
