use crate::{
    XooaClient,
    dto::{PendingTransaction, QueryResult},
    error::Error,
    gateway::{Mode, Outcome, Request, Timeout, path_segment},
};

/// Read-only smart contract calls.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait QueryApi: Send + Sync {
    async fn query(
        &self,
        function: &str,
        args: &[String],
        timeout: Timeout,
    ) -> Result<Outcome<QueryResult>, Error>;

    async fn query_async(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<PendingTransaction, Error>;
}

#[async_trait::async_trait]
impl QueryApi for XooaClient {
    async fn query(
        &self,
        function: &str,
        args: &[String],
        timeout: Timeout,
    ) -> Result<Outcome<QueryResult>, Error> {
        let function = path_segment(function, "function")?;
        self.execute(Request::post(
            "query",
            vec!["query", function],
            Mode::Blocking(timeout),
            Some(serde_json::json!(args)),
        ))
        .await
    }

    async fn query_async(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<PendingTransaction, Error> {
        let function = path_segment(function, "function")?;
        self.execute_pending(Request::post(
            "query",
            vec!["query", function],
            Mode::Pending(Timeout::PENDING),
            Some(serde_json::json!(args)),
        ))
        .await
    }
}
