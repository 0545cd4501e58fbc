use crate::{
    XooaClient,
    dto::{InvokeResult, PendingTransaction},
    error::Error,
    gateway::{Mode, Outcome, Request, Timeout, path_segment},
};

/// Ledger mutating smart contract calls.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait InvokeApi: Send + Sync {
    /// Calls `function` of the application's smart contract with `args`.
    /// The number and meaning of the arguments is up to the contract.
    async fn invoke(
        &self,
        function: &str,
        args: &[String],
        timeout: Timeout,
    ) -> Result<Outcome<InvokeResult>, Error>;

    async fn invoke_async(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<PendingTransaction, Error>;
}

/// Gateway timeout of invocations asking for a pending result.
const PENDING_INVOKE: Timeout = Timeout::from_millis(3000);

#[async_trait::async_trait]
impl InvokeApi for XooaClient {
    async fn invoke(
        &self,
        function: &str,
        args: &[String],
        timeout: Timeout,
    ) -> Result<Outcome<InvokeResult>, Error> {
        let function = path_segment(function, "function")?;
        self.execute(Request::post(
            "invoke",
            vec!["invoke", function],
            Mode::Blocking(timeout),
            Some(serde_json::json!(args)),
        ))
        .await
    }

    async fn invoke_async(
        &self,
        function: &str,
        args: &[String],
    ) -> Result<PendingTransaction, Error> {
        let function = path_segment(function, "function")?;
        self.execute_pending(Request::post(
            "invoke",
            vec!["invoke", function],
            Mode::Pending(PENDING_INVOKE),
            Some(serde_json::json!(args)),
        ))
        .await
    }
}
