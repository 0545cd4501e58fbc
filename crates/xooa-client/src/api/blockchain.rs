use crate::{
    XooaClient,
    dto::{Block, CurrentBlock, PendingTransaction, Transaction},
    error::Error,
    gateway::{Mode, Outcome, Request, Timeout, path_segment},
};

/// Ledger lookups.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait BlockchainApi: Send + Sync {
    /// Latest block of the application's channel.
    async fn current_block(&self, timeout: Timeout) -> Result<Outcome<CurrentBlock>, Error>;

    async fn current_block_async(&self) -> Result<PendingTransaction, Error>;

    async fn block_by_number(
        &self,
        number: u64,
        timeout: Timeout,
    ) -> Result<Outcome<Block>, Error>;

    async fn block_by_number_async(&self, number: u64) -> Result<PendingTransaction, Error>;

    /// Transaction details including its read and write sets.
    async fn transaction(
        &self,
        transaction_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Transaction>, Error>;

    async fn transaction_async(&self, transaction_id: &str) -> Result<PendingTransaction, Error>;
}

#[async_trait::async_trait]
impl BlockchainApi for XooaClient {
    async fn current_block(&self, timeout: Timeout) -> Result<Outcome<CurrentBlock>, Error> {
        self.execute(Request::get(
            "current_block",
            vec!["block", "current"],
            Mode::Blocking(timeout),
        ))
        .await
    }

    async fn current_block_async(&self) -> Result<PendingTransaction, Error> {
        self.execute_pending(Request::get(
            "current_block",
            vec!["block", "current"],
            Mode::Pending(Timeout::PENDING),
        ))
        .await
    }

    async fn block_by_number(
        &self,
        number: u64,
        timeout: Timeout,
    ) -> Result<Outcome<Block>, Error> {
        let number = number.to_string();
        self.execute(Request::get(
            "block",
            vec!["block", &number],
            Mode::Blocking(timeout),
        ))
        .await
    }

    async fn block_by_number_async(&self, number: u64) -> Result<PendingTransaction, Error> {
        let number = number.to_string();
        self.execute_pending(Request::get(
            "block",
            vec!["block", &number],
            Mode::Pending(Timeout::PENDING),
        ))
        .await
    }

    async fn transaction(
        &self,
        transaction_id: &str,
        timeout: Timeout,
    ) -> Result<Outcome<Transaction>, Error> {
        let transaction_id = path_segment(transaction_id, "transaction id")?;
        self.execute(Request::get(
            "transaction",
            vec!["transactions", transaction_id],
            Mode::Blocking(timeout),
        ))
        .await
    }

    async fn transaction_async(&self, transaction_id: &str) -> Result<PendingTransaction, Error> {
        let transaction_id = path_segment(transaction_id, "transaction id")?;
        self.execute_pending(Request::get(
            "transaction",
            vec!["transactions", transaction_id],
            Mode::Pending(Timeout::PENDING),
        ))
        .await
    }
}
