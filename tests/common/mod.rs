//! Common test utilities for log-download-manager integration tests

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use log_download_manager::api::auth::Claims;
use log_download_manager::{Config, DownloadOperation, DownloadState, LogDownloadManager, RequestId};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Secret used to sign test tokens
pub const SECRET: &str = "integration-secret";

/// Configuration pointing at `search_endpoint` and writing into `dir`
pub fn config_for(dir: &Path, search_endpoint: &str) -> Config {
    let mut config = Config::default();
    config.export.download_dir = dir.to_path_buf();
    config.search.endpoint = Url::parse(search_endpoint).unwrap();
    config.search.request_timeout = Duration::from_secs(5);
    config.auth.secret = SECRET.to_string();
    config
}

/// HS256 token for a user of `organization_id`
pub fn token_for(organization_id: &str) -> String {
    let claims = Claims {
        user_id: "integration-user".into(),
        access: vec!["APPS".into()],
        role: "Operator".into(),
        organization_id: organization_id.into(),
        exp: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// Poll until the export leaves Queued/Generating
pub async fn wait_for_outcome(
    manager: &LogDownloadManager,
    request_id: &RequestId,
) -> DownloadOperation {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let op = manager.registry().get(request_id).await.unwrap();
        if !matches!(op.state, DownloadState::Queued | DownloadState::Generating) {
            return op;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "export {request_id} did not finish"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
