use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use tracing::{debug, warn};

use crate::core::config::LauncherConfig;
use crate::core::error::{LauncherError, LauncherResult};

pub fn build_http_client(config: &LauncherConfig) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(format!(
            "{}/{}",
            config.launcher_name(),
            config.launcher_version()
        ))
        .default_headers(default_headers)
        .timeout(config.http_timeout())
        .connect_timeout(config.connect_timeout())
        .build()
}

/// DNS reachability check run before a launch touches the network.
pub async fn probe_connectivity(config: &LauncherConfig) -> LauncherResult<()> {
    let host = config.tunables().probe_host.clone();
    let lookup = tokio::net::lookup_host(host.clone());

    match tokio::time::timeout(config.probe_timeout(), lookup).await {
        Ok(Ok(mut addrs)) => {
            if addrs.next().is_some() {
                debug!("Connectivity probe resolved {}", host);
                Ok(())
            } else {
                Err(LauncherError::OfflinePrecondition(format!(
                    "{} resolved to no addresses",
                    host
                )))
            }
        }
        Ok(Err(e)) => {
            warn!("Connectivity probe failed for {}: {}", host, e);
            Err(LauncherError::OfflinePrecondition(format!(
                "cannot resolve {}: {}",
                host, e
            )))
        }
        Err(_) => Err(LauncherError::OfflinePrecondition(format!(
            "DNS lookup for {} timed out",
            host
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Tunables;

    #[tokio::test]
    async fn probe_rejects_unresolvable_host() {
        let tunables = Tunables {
            probe_host: "host.invalid:443".into(),
            probe_timeout_secs: 2,
            ..Tunables::default()
        };
        let config = LauncherConfig::new("/tmp").with_tunables(tunables);

        let err = probe_connectivity(&config).await.unwrap_err();
        assert!(matches!(err, LauncherError::OfflinePrecondition(_)));
    }
}
