pub mod commands;
pub mod server_types;

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use url::Url;

pub use self::server_types::*;
use crate::{account::Credentials, appconfig::AppSettings, transfer::FormFields};

/// Form-POST client for the training service. Each request runs on its own
/// thread and reports back with exactly one `ServerReply`.
pub struct ServerControl {
    base: Url,
    client: reqwest::blocking::Client,
    channel_to_ui: crossbeam_channel::Sender<ServerReply>,
    id: AtomicU64,
}

impl ServerControl {
    pub fn new(
        settings: &AppSettings,
        channel_to_ui: crossbeam_channel::Sender<ServerReply>,
    ) -> Result<Self> {
        let mut base = Url::parse(&settings.server_url)
            .with_context(|| format!("Invalid server url: {}", settings.server_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(settings.request_timeout_secs.map(Duration::from_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(ServerControl {
            base,
            client,
            channel_to_ui,
            id: AtomicU64::new(1),
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> Result<Url> {
        self.base
            .join(endpoint.path())
            .with_context(|| format!("Failed to build url for {:?}", endpoint))
    }

    /// Starts the request on a worker thread and returns its id.
    pub fn dispatch(&self, command: ServerCommand, credentials: &Credentials) -> Result<u64> {
        let id = self.id.fetch_add(1, Ordering::Relaxed);
        let endpoint = command.endpoint();
        let url = self.url(endpoint)?;
        let fields = command.into_form(credentials);
        let client = self.client.clone();
        let tx = self.channel_to_ui.clone();

        debug!("request {} -> {}", id, url);

        std::thread::spawn(move || {
            let body = post_form(&client, url, &fields).map_err(|e| {
                error!("request {} failed: {:#}", id, e);
                format!("{:#}", e)
            });

            if tx.send(ServerReply { id, endpoint, body }).is_err() {
                warn!("reply {} dropped, receiver gone", id);
            }
        });

        Ok(id)
    }
}

/// URL-encoded POST; only a 200 response carries a body.
pub fn post_form(client: &reqwest::blocking::Client, url: Url, fields: &FormFields) -> Result<Vec<u8>> {
    let res = client
        .post(url)
        .header("Content-Transfer-Encoding", "Binary")
        .form(fields)
        .send()
        .context("Failed to send request")?;

    let status = res.status();
    if status != reqwest::StatusCode::OK {
        bail!("Server returned {}", status);
    }

    let bytes = res.bytes().context("Failed to read response")?;
    trace!("response: {} bytes", bytes.len());

    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(server_url: &str) -> (ServerControl, crossbeam_channel::Receiver<ServerReply>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let settings = AppSettings {
            server_url: server_url.to_string(),
            ..Default::default()
        };
        (ServerControl::new(&settings, tx).unwrap(), rx)
    }

    #[test]
    fn test_endpoint_urls() {
        let (server, _rx) = control("http://54.64.165.196");
        assert_eq!(
            server.url(Endpoint::Login).unwrap().as_str(),
            "http://54.64.165.196/log_in.php"
        );

        let (server, _rx) = control("http://host/training");
        assert_eq!(
            server.url(Endpoint::Download).unwrap().as_str(),
            "http://host/training/download.php"
        );
    }

    #[test]
    fn test_failed_request_still_replies() {
        /// nothing listens on the discard port
        let (server, rx) = control("http://127.0.0.1:9");
        let id = server
            .dispatch(ServerCommand::Login, &Credentials::new("op", "pw"))
            .unwrap();

        let reply = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(reply.id, id);
        assert_eq!(reply.endpoint, Endpoint::Login);
        assert!(reply.body.is_err());
        assert!(rx.try_recv().is_err());
    }
}
