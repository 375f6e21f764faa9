use std::sync::Arc;

use box_core::auth::Authenticator;
use box_core::client::{BoxApi, HttpBoxClient};
use box_core::services::{BoxSession, BuildClientFn, SessionError};
use tracing::info;

use crate::config::BoxConfig;

pub fn build_session(config: &BoxConfig) -> BoxSession {
    let build_config = config.clone();
    let build: BuildClientFn = Arc::new(move || {
        let config = build_config.clone();
        Box::pin(async move {
            let mut http = reqwest::Client::builder();
            if let Some(timeout) = config.request_timeout {
                http = http.timeout(timeout);
            }
            let http = http.build().map_err(map_build_error)?;

            let auth = Arc::new(Authenticator::new(
                http.clone(),
                config.endpoints.clone(),
                config.credentials.clone(),
            ));
            auth.authenticate().await.map_err(map_build_error)?;
            info!(mode = config.credentials.mode(), "authenticated with Box");

            let client: Arc<dyn BoxApi> =
                Arc::new(HttpBoxClient::new(http, config.endpoints, auth));
            Ok(client)
        })
    });
    BoxSession::new(build)
}

fn map_build_error(err: impl std::fmt::Display) -> SessionError {
    SessionError::BuildFailed(err.to_string())
}
