use crate::{
    XooaClient,
    dto::{Deleted, Identity, IdentityRequest, PendingTransaction},
    error::Error,
    gateway::{Mode, Outcome, Request, Timeout, non_blank, path_segment},
};

/// Management of the identities that may use the application.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait IdentitiesApi: Send + Sync {
    /// The identity the API token belongs to.
    async fn current_identity(&self, timeout: Timeout) -> Result<Outcome<Identity>, Error>;

    /// All identities of the application. Only names, ids, creation dates
    /// and the management flag are filled in.
    async fn identities(&self, timeout: Timeout) -> Result<Outcome<Vec<Identity>>, Error>;

    async fn enroll_identity(
        &self,
        request: &IdentityRequest,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error>;

    async fn enroll_identity_async(
        &self,
        request: &IdentityRequest,
    ) -> Result<PendingTransaction, Error>;

    /// Issues a new API token for the identity; the old one stops working.
    async fn regenerate_identity_api_token(
        &self,
        identity_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error>;

    async fn identity(
        &self,
        identity_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error>;

    /// Returns whether the gateway deleted the identity.
    async fn delete_identity(
        &self,
        identity_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<bool>, Error>;
}

#[async_trait::async_trait]
impl IdentitiesApi for XooaClient {
    async fn current_identity(&self, timeout: Timeout) -> Result<Outcome<Identity>, Error> {
        self.execute(Request::get(
            "current_identity",
            vec!["identities", "me"],
            Mode::Blocking(timeout),
        ))
        .await
    }

    async fn identities(&self, timeout: Timeout) -> Result<Outcome<Vec<Identity>>, Error> {
        self.execute(Request::get(
            "identities",
            vec!["identities", ""],
            Mode::Blocking(timeout),
        ))
        .await
    }

    async fn enroll_identity(
        &self,
        request: &IdentityRequest,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error> {
        non_blank(&request.identity_name, "identity name")?;
        self.execute(Request::post(
            "enroll_identity",
            vec!["identities", ""],
            Mode::Blocking(timeout),
            Some(serde_json::json!(request)),
        ))
        .await
    }

    async fn enroll_identity_async(
        &self,
        request: &IdentityRequest,
    ) -> Result<PendingTransaction, Error> {
        non_blank(&request.identity_name, "identity name")?;
        self.execute_pending(Request::post(
            "enroll_identity",
            vec!["identities", ""],
            Mode::Pending(Timeout::PENDING),
            Some(serde_json::json!(request)),
        ))
        .await
    }

    async fn regenerate_identity_api_token(
        &self,
        identity_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error> {
        let identity_id = path_segment(identity_id, "identity id")?;
        self.execute(Request::post(
            "regenerate_identity_api_token",
            vec!["identities", identity_id, "regeneratetoken"],
            Mode::Blocking(timeout),
            None,
        ))
        .await
    }

    async fn identity(
        &self,
        identity_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error> {
        let identity_id = path_segment(identity_id, "identity id")?;
        self.execute(Request::get(
            "identity",
            vec!["identities", identity_id],
            Mode::Blocking(timeout),
        ))
        .await
    }

    async fn delete_identity(
        &self,
        identity_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<bool>, Error> {
        let identity_id = path_segment(identity_id, "identity id")?;
        let outcome: Outcome<Deleted> = self
            .execute(Request::delete(
                "delete_identity",
                vec!["identities", identity_id],
                Mode::Blocking(timeout),
            ))
            .await?;
        Ok(outcome.map(|response| response.deleted))
    }
}
