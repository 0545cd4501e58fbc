use {
    crate::{
        XooaClient,
        config::Config,
        events::ProtocolVersion,
        http_client::{self, HttpClientFactory},
    },
    anyhow::Result,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        time::Duration,
    },
    url::Url,
};

/// Command line arguments of a gateway client.
///
/// Values given here override the ones of the configuration file.
#[derive(clap::Parser, Debug)]
#[group(skip)]
pub struct Arguments {
    #[clap(flatten)]
    pub http_client: http_client::Arguments,

    /// TOML configuration file.
    #[clap(long, env = "XOOA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the application's gateway API.
    #[clap(long, env)]
    pub app_url: Option<Url>,

    /// API token of the identity to act as.
    #[clap(long, env = "XOOA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// How long the gateway may block before answering with a pending
    /// result.
    #[clap(long, env, value_parser = humantime::parse_duration)]
    pub gateway_timeout: Option<Duration>,

    /// Socket.IO server publishing smart contract events.
    #[clap(long, env)]
    pub events_url: Option<Url>,

    /// Engine.IO protocol version of the events server (3 or 4).
    #[clap(long, env)]
    pub events_protocol: Option<ProtocolVersion>,

    /// Consecutive reconnection attempts before a subscription gives up.
    #[clap(long, env)]
    pub events_retries: Option<u32>,

    #[clap(long, env, value_parser = humantime::parse_duration)]
    pub events_reconnect_delay: Option<Duration>,
}

impl Arguments {
    /// Reads the configuration file, if any, and applies the command line
    /// overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(app_url) = &self.app_url {
            config.app_url = app_url.clone();
        }
        if let Some(api_token) = &self.api_token {
            config.api_token = Some(api_token.clone());
        }
        if let Some(timeout) = self.gateway_timeout {
            config.gateway_timeout = Some(timeout);
        }
        if let Some(url) = &self.events_url {
            config.events.url = url.clone();
        }
        if let Some(version) = self.events_protocol {
            config.events.version = version;
        }
        if let Some(retries) = self.events_retries {
            config.events.retries = retries;
        }
        if let Some(delay) = self.events_reconnect_delay {
            config.events.reconnect_delay = delay;
        }
        Ok(config)
    }

    pub fn client(&self) -> Result<XooaClient> {
        let factory = HttpClientFactory::new(&self.http_client);
        XooaClient::from_config(&factory, &self.load_config()?)
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            http_client,
            config,
            app_url,
            api_token,
            gateway_timeout,
            events_url,
            events_protocol,
            events_retries,
            events_reconnect_delay,
        } = self;

        write!(f, "{}", http_client)?;
        writeln!(f, "config: {:?}", config)?;
        display_option(f, "app_url", app_url)?;
        display_secret_option(f, "api_token", api_token)?;
        writeln!(f, "gateway_timeout: {:?}", gateway_timeout)?;
        display_option(f, "events_url", events_url)?;
        display_option(f, "events_protocol", events_protocol)?;
        display_option(f, "events_retries", events_retries)?;
        writeln!(f, "events_reconnect_delay: {:?}", events_reconnect_delay)?;
        Ok(())
    }
}

fn display_option(f: &mut Formatter<'_>, name: &str, option: &Option<impl Display>) -> fmt::Result {
    match option {
        Some(display) => writeln!(f, "{}: {}", name, display),
        None => writeln!(f, "{}: None", name),
    }
}

fn display_secret_option<T>(f: &mut Formatter<'_>, name: &str, option: &Option<T>) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}
