use {
    crate::{
        XooaClient,
        dto::{
            Block,
            CurrentBlock,
            Identity,
            InvokeResult,
            QueryResult,
            ResultEnvelope,
            Transaction,
        },
        error::Error,
        gateway::{Mode, Outcome, Request, Timeout, path_segment},
    },
    serde::de::DeserializeOwned,
};

/// Polling of results handed out as pending transactions.
///
/// Every call answers [`Outcome::Pending`] again while the gateway is still
/// processing the original request.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait ResultApi: Send + Sync {
    async fn result_for_query(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<QueryResult>, Error>;

    async fn result_for_invoke(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<InvokeResult>, Error>;

    async fn result_for_identity(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error>;

    async fn result_for_current_block(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<CurrentBlock>, Error>;

    async fn result_for_block_by_number(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Block>, Error>;

    async fn result_for_transaction(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Transaction>, Error>;
}

impl XooaClient {
    async fn result<T: DeserializeOwned>(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<T>, Error> {
        let result_id = path_segment(result_id, "result id")?;
        let outcome: Outcome<ResultEnvelope<T>> = self
            .execute(Request::get(
                "result",
                vec!["results", result_id],
                Mode::Blocking(timeout),
            ))
            .await?;
        Ok(outcome.map(|envelope| envelope.result))
    }
}

#[async_trait::async_trait]
impl ResultApi for XooaClient {
    async fn result_for_query(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<QueryResult>, Error> {
        // Query results carry the bare payload.
        let outcome: Outcome<serde_json::Value> = self.result(result_id, timeout).await?;
        Ok(outcome.map(QueryResult::from))
    }

    async fn result_for_invoke(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<InvokeResult>, Error> {
        self.result(result_id, timeout).await
    }

    async fn result_for_identity(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Identity>, Error> {
        self.result(result_id, timeout).await
    }

    async fn result_for_current_block(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<CurrentBlock>, Error> {
        self.result(result_id, timeout).await
    }

    async fn result_for_block_by_number(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Block>, Error> {
        self.result(result_id, timeout).await
    }

    async fn result_for_transaction(
        &self,
        result_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Transaction>, Error> {
        self.result(result_id, timeout).await
    }
}
