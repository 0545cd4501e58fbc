//! Runs the parsed commands against the gateway and renders their results as
//! JSON.

use {
    crate::arguments::{Call, EnrollArguments, GatewayCommand, IdentityCommand, ResultKind},
    anyhow::{Context, Result},
    serde::Serialize,
    serde_json::{Value, json},
    std::{future::Future, io::Write},
    xooa_client::{
        BlockchainApi,
        IdentitiesApi,
        InvokeApi,
        Outcome,
        QueryApi,
        ResultApi,
        Timeout,
        dto::{IdentityRequest, PendingTransaction},
        events::{Subscription, SubscriptionEvent},
    },
};

pub async fn execute<C>(client: &C, command: GatewayCommand, timeout: Timeout) -> Result<Value>
where
    C: BlockchainApi + IdentitiesApi + InvokeApi + QueryApi + ResultApi,
{
    tracing::debug!(?command, "executing");
    match command {
        GatewayCommand::Validate => identity(client, IdentityCommand::Me, timeout).await,
        GatewayCommand::CurrentBlock { pending } => current_block(client, pending, timeout).await,
        GatewayCommand::Block { number, pending } => block(client, number, pending, timeout).await,
        GatewayCommand::Transaction { id, pending } => {
            transaction(client, &id, pending, timeout).await
        }
        GatewayCommand::Invoke(call) => invoke(client, &call, timeout).await,
        GatewayCommand::Query(call) => query(client, &call, timeout).await,
        GatewayCommand::Result { kind, result_id } => {
            result(client, kind, &result_id, timeout).await
        }
        GatewayCommand::Identity(command) => identity(client, command, timeout).await,
    }
}

async fn current_block(api: &dyn BlockchainApi, pending: bool, timeout: Timeout) -> Result<Value> {
    if pending {
        return pending_result(api.current_block_async().await?);
    }
    render(api.current_block(timeout).await?)
}

async fn block(
    api: &dyn BlockchainApi,
    number: u64,
    pending: bool,
    timeout: Timeout,
) -> Result<Value> {
    if pending {
        return pending_result(api.block_by_number_async(number).await?);
    }
    render(api.block_by_number(number, timeout).await?)
}

async fn transaction(
    api: &dyn BlockchainApi,
    id: &str,
    pending: bool,
    timeout: Timeout,
) -> Result<Value> {
    if pending {
        return pending_result(api.transaction_async(id).await?);
    }
    render(api.transaction(id, timeout).await?)
}

async fn invoke(api: &dyn InvokeApi, call: &Call, timeout: Timeout) -> Result<Value> {
    if call.pending {
        return pending_result(api.invoke_async(&call.function, &call.args).await?);
    }
    render(api.invoke(&call.function, &call.args, timeout).await?)
}

async fn query(api: &dyn QueryApi, call: &Call, timeout: Timeout) -> Result<Value> {
    if call.pending {
        return pending_result(api.query_async(&call.function, &call.args).await?);
    }
    render(api.query(&call.function, &call.args, timeout).await?)
}

async fn result(
    api: &dyn ResultApi,
    kind: ResultKind,
    result_id: &str,
    timeout: Timeout,
) -> Result<Value> {
    match kind {
        ResultKind::Query => render(api.result_for_query(result_id, timeout).await?),
        ResultKind::Invoke => render(api.result_for_invoke(result_id, timeout).await?),
        ResultKind::Identity => render(api.result_for_identity(result_id, timeout).await?),
        ResultKind::CurrentBlock => {
            render(api.result_for_current_block(result_id, timeout).await?)
        }
        ResultKind::Block => render(api.result_for_block_by_number(result_id, timeout).await?),
        ResultKind::Transaction => render(api.result_for_transaction(result_id, timeout).await?),
    }
}

async fn identity(
    api: &dyn IdentitiesApi,
    command: IdentityCommand,
    timeout: Timeout,
) -> Result<Value> {
    match command {
        IdentityCommand::Me => render(api.current_identity(timeout).await?),
        IdentityCommand::List => render(api.identities(timeout).await?),
        IdentityCommand::Get { id } => render(api.identity(&id, timeout).await?),
        IdentityCommand::Enroll(enroll) => {
            let pending = enroll.pending;
            let request = enrollment(enroll);
            if pending {
                return pending_result(api.enroll_identity_async(&request).await?);
            }
            render(api.enroll_identity(&request, timeout).await?)
        }
        IdentityCommand::RegenerateToken { id } => {
            render(api.regenerate_identity_api_token(&id, timeout).await?)
        }
        IdentityCommand::Delete { id } => render(
            api.delete_identity(&id, timeout)
                .await?
                .map(|deleted| json!({ "deleted": deleted })),
        ),
    }
}

fn enrollment(arguments: EnrollArguments) -> IdentityRequest {
    IdentityRequest {
        identity_name: arguments.name,
        access: arguments.access,
        can_manage_identities: arguments.can_manage_identities,
        attributes: arguments
            .attributes
            .into_iter()
            .chain(arguments.ecert_attributes)
            .collect(),
    }
}

fn render<T: Serialize>(outcome: Outcome<T>) -> Result<Value> {
    match outcome {
        Outcome::Ready(value) => Ok(serde_json::to_value(value)?),
        Outcome::Pending(pending) => pending_result(pending),
    }
}

fn pending_result(pending: PendingTransaction) -> Result<Value> {
    tracing::info!(result_id = %pending.result_id, "gateway is still processing the request");
    Ok(serde_json::to_value(pending)?)
}

/// Writes every delivered event as a JSON line to `out` until `shutdown`
/// completes or the subscription ends on its own.
pub async fn follow(
    mut subscription: Subscription,
    shutdown: impl Future<Output = ()>,
    out: &mut impl Write,
) -> Result<()> {
    let mut shutdown = std::pin::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = subscription.next() => match event {
                Some(SubscriptionEvent::Event(event)) => {
                    writeln!(out, "{}", event.payload)?;
                    out.flush()?;
                }
                Some(state) => tracing::info!(?state, "subscription state changed"),
                None => break,
            },
        }
    }
    subscription
        .unsubscribe()
        .await
        .context("event subscription failed")
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        xooa_client::{
            api::{MockBlockchainApi, MockIdentitiesApi, MockInvokeApi, MockResultApi},
            dto::{Access, Attribute, CurrentBlock, Identity, InvokeResult, QueryResult},
            events::{self, EventFilter},
        },
    };

    fn pending() -> PendingTransaction {
        PendingTransaction {
            result_id: "9e7b".to_string(),
            result_url: "https://api.xooa.com/api/v1/results/9e7b".to_string(),
        }
    }

    #[tokio::test]
    async fn current_block_outcomes() {
        let mut api = MockBlockchainApi::new();
        api.expect_current_block()
            .withf(|timeout| *timeout == Timeout::DEFAULT)
            .times(1)
            .returning(|_| {
                Ok(Outcome::Ready(CurrentBlock {
                    current_block_hash: "abc".to_string(),
                    previous_block_hash: "def".to_string(),
                    block_number: 7,
                }))
            });
        api.expect_current_block_async()
            .times(1)
            .returning(|| Ok(pending()));

        assert_eq!(
            current_block(&api, false, Timeout::DEFAULT).await.unwrap(),
            json!({
                "currentBlockHash": "abc",
                "previousBlockHash": "def",
                "blockNumber": 7,
            })
        );
        assert_eq!(
            current_block(&api, true, Timeout::DEFAULT).await.unwrap(),
            json!({
                "resultId": "9e7b",
                "resultURL": "https://api.xooa.com/api/v1/results/9e7b",
            })
        );
    }

    #[tokio::test]
    async fn invoke_forwards_arguments() {
        let mut api = MockInvokeApi::new();
        api.expect_invoke()
            .withf(|function, args, timeout| {
                function == "set" && args == ["a", "10"] && *timeout == Timeout::from_millis(500)
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(Outcome::Ready(InvokeResult {
                    transaction_id: "tx".to_string(),
                    payload: "10".to_string(),
                }))
            });

        let call = Call {
            function: "set".to_string(),
            args: vec!["a".to_string(), "10".to_string()],
            pending: false,
        };
        assert_eq!(
            invoke(&api, &call, Timeout::from_millis(500)).await.unwrap(),
            json!({"txId": "tx", "payload": "10"})
        );
    }

    #[tokio::test]
    async fn blocking_call_can_still_be_pending() {
        let mut api = MockResultApi::new();
        api.expect_result_for_query()
            .withf(|result_id, _| result_id == "9e7b")
            .times(1)
            .returning(|_, _| Ok(Outcome::Pending(pending())));
        api.expect_result_for_invoke().never();

        let output = result(&api, ResultKind::Query, "9e7b", Timeout::DEFAULT)
            .await
            .unwrap();
        assert_eq!(output["resultId"], "9e7b");
    }

    #[tokio::test]
    async fn query_result_payload() {
        let mut api = MockResultApi::new();
        api.expect_result_for_query().returning(|_, _| {
            Ok(Outcome::Ready(QueryResult {
                payload: "42".to_string(),
            }))
        });

        assert_eq!(
            result(&api, ResultKind::Query, "9e7b", Timeout::DEFAULT)
                .await
                .unwrap(),
            json!({"payload": "42"})
        );
    }

    #[tokio::test]
    async fn enroll_builds_request() {
        let mut api = MockIdentitiesApi::new();
        api.expect_enroll_identity_async()
            .withf(|request| {
                *request
                    == IdentityRequest {
                        identity_name: "Kavi".to_string(),
                        access: Access::Read,
                        can_manage_identities: true,
                        attributes: vec![
                            Attribute {
                                name: "department".to_string(),
                                value: "finance".to_string(),
                                ecert: false,
                            },
                            Attribute {
                                name: "level".to_string(),
                                value: "3".to_string(),
                                ecert: true,
                            },
                        ],
                    }
            })
            .times(1)
            .returning(|_| Ok(pending()));

        let command = IdentityCommand::Enroll(EnrollArguments {
            name: "Kavi".to_string(),
            access: Access::Read,
            can_manage_identities: true,
            attributes: vec![Attribute {
                name: "department".to_string(),
                value: "finance".to_string(),
                ecert: false,
            }],
            ecert_attributes: vec![Attribute {
                name: "level".to_string(),
                value: "3".to_string(),
                ecert: true,
            }],
            pending: true,
        });
        let output = identity(&api, command, Timeout::DEFAULT).await.unwrap();
        assert_eq!(output["resultId"], "9e7b");
    }

    #[tokio::test]
    async fn identity_listing_and_deletion() {
        let mut api = MockIdentitiesApi::new();
        api.expect_identities().returning(|_| {
            Ok(Outcome::Ready(vec![Identity {
                id: "8c3d".to_string(),
                identity_name: "Kavi".to_string(),
                ..Default::default()
            }]))
        });
        api.expect_delete_identity()
            .withf(|id, _| id == "8c3d")
            .returning(|_, _| Ok(Outcome::Ready(true)));

        let listing = identity(&api, IdentityCommand::List, Timeout::DEFAULT)
            .await
            .unwrap();
        assert_eq!(listing[0]["Id"], "8c3d");
        assert_eq!(listing[0]["IdentityName"], "Kavi");

        let deleted = identity(
            &api,
            IdentityCommand::Delete {
                id: "8c3d".to_string(),
            },
            Timeout::DEFAULT,
        )
        .await
        .unwrap();
        assert_eq!(deleted, json!({"deleted": true}));
    }

    #[tokio::test]
    async fn api_errors_propagate() {
        let mut api = MockBlockchainApi::new();
        api.expect_transaction().returning(|_, _| {
            Err(xooa_client::Error::Api {
                status: xooa_client::StatusCode::NOT_FOUND,
                message: "transaction not found".to_string(),
            })
        });

        let err = transaction(&api, "missing", false, Timeout::DEFAULT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("transaction not found"));
    }

    #[tokio::test]
    async fn follow_reports_failed_subscription() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = events::Config {
            url: url::Url::parse(&format!("ws://{addr}")).unwrap(),
            retries: 0,
            ..Default::default()
        };
        let subscription = events::subscribe(config, "token", EventFilter::All).unwrap();

        let mut out = Vec::new();
        let err = follow(subscription, std::future::pending(), &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("event subscription failed"));
        assert!(out.is_empty());
    }
}
