use {
    crate::{
        api::IdentitiesApi,
        config::Config,
        dto::{Identity, PendingTransaction},
        error::Error,
        events::{self, EventFilter, Subscription},
        gateway::{self, DEFAULT_APP_URL, Outcome, Request, Timeout},
        http_client::HttpClientFactory,
        metrics::Metrics,
    },
    anyhow::Context,
    reqwest::{
        Client,
        StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
    },
    serde::de::DeserializeOwned,
    std::fmt::{self, Debug, Formatter},
    url::Url,
};

const JSON: &str = "application/json";

/// HTTP client of the Xooa gateway API of one application.
///
/// All endpoint groups are implemented as traits on this type, see the
/// [`api`](crate::api) module.
#[derive(Clone)]
pub struct XooaClient {
    client: Client,
    app_url: Url,
    api_token: String,
    authorization: HeaderValue,
    timeout: Timeout,
    events: events::Config,
}

impl XooaClient {
    /// Creates a client for the default gateway URL.
    pub fn new(api_token: &str, client: Client) -> Result<Self, Error> {
        Self::with_url(Url::parse(DEFAULT_APP_URL)?, api_token, client)
    }

    pub fn with_url(app_url: Url, api_token: &str, client: Client) -> Result<Self, Error> {
        Ok(Self {
            client,
            app_url,
            api_token: api_token.to_string(),
            authorization: authorization(api_token)?,
            timeout: Timeout::default(),
            events: events::Config::default(),
        })
    }

    pub fn from_config(factory: &HttpClientFactory, config: &Config) -> anyhow::Result<Self> {
        let api_token = config
            .api_token
            .as_deref()
            .context("no api token configured")?;
        let client = factory.create().context("failed to build http client")?;
        let mut this = Self::with_url(config.app_url.clone(), api_token, client)?
            .with_events(config.events.clone());
        if let Some(timeout) = config.gateway_timeout {
            this = this.with_timeout(timeout.into());
        }
        Ok(this)
    }

    pub fn with_events(mut self, events: events::Config) -> Self {
        self.events = events;
        self
    }

    /// Sets the gateway timeout used by [`Self::validate`] and returned by
    /// [`Self::timeout`].
    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn app_url(&self) -> &Url {
        &self.app_url
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn events_config(&self) -> &events::Config {
        &self.events
    }

    pub fn set_api_token(&mut self, api_token: &str) -> Result<(), Error> {
        self.authorization = authorization(api_token)?;
        self.api_token = api_token.to_string();
        Ok(())
    }

    pub fn set_app_url(&mut self, app_url: &str) -> Result<(), Error> {
        let app_url = gateway::non_blank(app_url, "app url")?;
        self.app_url = Url::parse(app_url)?;
        Ok(())
    }

    /// Checks the API token by fetching the identity it belongs to.
    pub async fn validate(&self) -> Result<Outcome<Identity>, Error> {
        self.current_identity(self.timeout).await
    }

    /// Subscribes to the smart contract events of the application.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_events(&self, filter: EventFilter) -> Result<Subscription, events::Error> {
        events::subscribe(self.events.clone(), &self.api_token, filter)
    }

    /// Runs a call that waits for the result up to the gateway timeout.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: Request<'_>,
    ) -> Result<Outcome<T>, Error> {
        self.dispatch(&request, gateway::classify).await
    }

    /// Runs a call that asks for a pending result right away.
    pub(crate) async fn execute_pending(
        &self,
        request: Request<'_>,
    ) -> Result<PendingTransaction, Error> {
        self.dispatch(&request, gateway::classify_pending).await
    }

    async fn dispatch<T: Reported>(
        &self,
        request: &Request<'_>,
        classify: impl FnOnce(StatusCode, &str) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let metrics = Metrics::get();
        let _timer = metrics.on_request_start(request.endpoint);

        let result = match self.send(request).await {
            Ok((status, body)) => classify(status, &body),
            Err(err) => Err(err),
        };
        let outcome = match &result {
            Ok(value) => value.label(),
            Err(err) => {
                tracing::warn!(endpoint = request.endpoint, %err, "gateway request failed");
                err.label()
            }
        };
        metrics.on_request_completed(request.endpoint, outcome);
        result
    }

    async fn send(&self, request: &Request<'_>) -> Result<(StatusCode, String), Error> {
        let url = request.url(&self.app_url)?;
        tracing::debug!(
            endpoint = request.endpoint,
            method = %request.method,
            %url,
            "querying gateway"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .query(&request.mode.query())
            .header(ACCEPT, JSON)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(CONTENT_TYPE, JSON);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(Error::Send)?;
        let status = response.status();
        let body = response.text().await.map_err(Error::TextFetch)?;
        tracing::debug!(endpoint = request.endpoint, %status, "gateway responded");
        tracing::trace!(endpoint = request.endpoint, body, "gateway response body");
        Ok((status, body))
    }
}

impl Debug for XooaClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("XooaClient")
            .field("app_url", &self.app_url.as_str())
            .field("api_token", &"SECRET")
            .field("timeout", &self.timeout)
            .field("events", &self.events)
            .finish()
    }
}

fn authorization(api_token: &str) -> Result<HeaderValue, Error> {
    let api_token = gateway::non_blank(api_token, "api token")?;
    let mut value = HeaderValue::from_str(&format!("Bearer {api_token}"))
        .map_err(|_| Error::InvalidArgument("api token"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Metric label of a successful call.
trait Reported {
    fn label(&self) -> &'static str;
}

impl<T> Reported for Outcome<T> {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Ready(_) => "ready",
            Outcome::Pending(_) => "pending",
        }
    }
}

impl Reported for PendingTransaction {
    fn label(&self) -> &'static str {
        "pending"
    }
}
