use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::client::BoxApi;
use crate::control::BoxControlPlane;

pub type BuildClientFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn BoxApi>, SessionError>> + Send + 'static>>;
pub type BuildClientFn = Arc<dyn Fn() -> BuildClientFuture + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Box client is not initialized")]
    Uninitialized,
    #[error("failed to build Box client: {0}")]
    BuildFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
}

/// Process-wide holder of the authenticated Box client.
///
/// The client is built at most once, by the first caller of [`BoxSession::initialize`];
/// concurrent callers wait for that build and share its result. A failed build
/// leaves the session uninitialized.
#[derive(Clone)]
pub struct BoxSession {
    client: Arc<OnceCell<Arc<dyn BoxApi>>>,
    build_client: Option<BuildClientFn>,
}

impl fmt::Debug for BoxSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BoxSession {
    pub fn new(build_client: BuildClientFn) -> Self {
        Self {
            client: Arc::new(OnceCell::new()),
            build_client: Some(build_client),
        }
    }

    /// A session whose client is already available.
    pub fn ready(client: Arc<dyn BoxApi>) -> Self {
        Self {
            client: Arc::new(OnceCell::new_with(Some(client))),
            build_client: None,
        }
    }

    /// Builds the client once; concurrent callers share the same attempt.
    ///
    /// # Errors
    /// Returns `SessionError::BuildFailed` when the client cannot be built.
    pub async fn initialize(&self) -> Result<Arc<dyn BoxApi>, SessionError> {
        let Some(build_client) = self.build_client.clone() else {
            return self.client();
        };
        let client = self
            .client
            .get_or_try_init(|| async move {
                let client = (build_client)().await?;
                info!("Box client initialized");
                Ok::<_, SessionError>(client)
            })
            .await?;
        Ok(Arc::clone(client))
    }

    /// # Errors
    /// Returns `SessionError::Uninitialized` before `initialize` succeeds.
    pub fn client(&self) -> Result<Arc<dyn BoxApi>, SessionError> {
        self.client
            .get()
            .map(Arc::clone)
            .ok_or(SessionError::Uninitialized)
    }

    /// # Errors
    /// Returns `SessionError::Uninitialized` before `initialize` succeeds.
    pub fn control(&self) -> Result<BoxControlPlane, SessionError> {
        self.client().map(BoxControlPlane::new)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.client.initialized() {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::testing::RecordingApi;

    fn build_test_session(calls: Arc<AtomicUsize>, fail: bool) -> BoxSession {
        let build: BuildClientFn = Arc::new(move || {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if fail {
                    return Err(SessionError::BuildFailed("credentials rejected".to_string()));
                }
                let client: Arc<dyn BoxApi> = Arc::new(RecordingApi::default());
                Ok(client)
            })
        });
        BoxSession::new(build)
    }

    #[tokio::test]
    async fn session_single_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = build_test_session(calls.clone(), false);

        let s1 = session.clone();
        let s2 = session.clone();
        let (left, right) = tokio::join!(s1.initialize(), s2.initialize());
        assert!(left.is_ok());
        assert!(right.is_ok());
        assert!(session.initialize().await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn client_before_initialize_is_an_error() {
        let session = build_test_session(Arc::new(AtomicUsize::new(0)), false);
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(matches!(session.client(), Err(SessionError::Uninitialized)));
        assert!(session.control().is_err());
    }

    #[tokio::test]
    async fn failed_build_leaves_session_uninitialized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = build_test_session(calls.clone(), true);

        let err = session.initialize().await.err().expect("build should fail");
        assert_eq!(
            err,
            SessionError::BuildFailed("credentials rejected".to_string())
        );
        assert_eq!(session.state(), SessionState::Uninitialized);

        let _ = session.initialize().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ready_session_shares_one_client() {
        let session = BoxSession::ready(Arc::new(RecordingApi::default()));
        let first = session.client().expect("client");
        let second = session.initialize().await.expect("client");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
