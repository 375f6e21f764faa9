use box_models::{AuthorizeOutcome, User};
use tracing::debug;

use super::{BoxControlPlane, ControlResult};

impl BoxControlPlane {
    /// Returns the user the session is authenticated as.
    ///
    /// # Errors
    /// Returns `ControlError` if the remote call fails.
    pub async fn who_am_i(&self) -> ControlResult<User> {
        debug!("fetching current user");
        Ok(self.client.current_user().await?)
    }

    /// Starts or repeats authorization of the application.
    ///
    /// # Errors
    /// Returns `ControlError` if authorization cannot be started.
    pub async fn authorize(&self) -> ControlResult<AuthorizeOutcome> {
        Ok(self.client.authorize().await?)
    }
}
