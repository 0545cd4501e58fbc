use {
    anyhow::Result,
    std::fmt::{self, Display, Formatter},
    tracing::level_filters::LevelFilter,
    xooa_client::{
        dto::{Access, Attribute},
        events::EventFilter,
    },
};

#[derive(clap::Parser, Debug)]
#[clap(name = "xooa", version, about = "Command line client of the Xooa blockchain gateway")]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    #[clap(flatten)]
    pub client: xooa_client::Arguments,

    /// Print the collected metrics in the prometheus text format on exit.
    #[clap(long)]
    pub print_metrics: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Parser, Debug)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,xooa_client=debug,xooa_cli=debug")]
    pub log_filter: String,

    /// Events up to this level are logged to stderr, the rest to stdout.
    #[clap(long, env, default_value = "trace")]
    pub log_stderr_threshold: LevelFilter,

    #[clap(long, env)]
    pub use_json_logs: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    #[clap(flatten)]
    Gateway(GatewayCommand),

    /// Prints smart contract events as JSON lines until interrupted.
    Subscribe(SubscribeArguments),
}

/// Commands answered by a single gateway request.
#[derive(clap::Subcommand, Debug, PartialEq)]
pub enum GatewayCommand {
    /// Checks that the API token belongs to an identity of the application.
    Validate,

    CurrentBlock {
        /// Ask for a pending result instead of waiting.
        #[clap(long = "async")]
        pending: bool,
    },

    Block {
        number: u64,
        #[clap(long = "async")]
        pending: bool,
    },

    Transaction {
        id: String,
        #[clap(long = "async")]
        pending: bool,
    },

    /// Submits a ledger mutating smart contract call.
    Invoke(Call),

    /// Evaluates a read-only smart contract call.
    Query(Call),

    /// Fetches the result of an earlier pending request.
    Result {
        #[clap(value_enum)]
        kind: ResultKind,
        result_id: String,
    },

    #[clap(subcommand)]
    Identity(IdentityCommand),
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct Call {
    pub function: String,
    pub args: Vec<String>,
    #[clap(long = "async")]
    pub pending: bool,
}

/// Request whose result is being fetched.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    Query,
    Invoke,
    Identity,
    CurrentBlock,
    Block,
    Transaction,
}

#[derive(clap::Subcommand, Debug, PartialEq)]
pub enum IdentityCommand {
    /// The identity the API token belongs to.
    Me,
    List,
    Get { id: String },
    Enroll(EnrollArguments),
    /// Issues a new API token for the identity.
    RegenerateToken { id: String },
    Delete { id: String },
}

#[derive(clap::Args, Debug, PartialEq)]
pub struct EnrollArguments {
    pub name: String,

    /// Ledger access of the identity: r, w or rw.
    #[clap(long, default_value = "rw")]
    pub access: Access,

    #[clap(long)]
    pub can_manage_identities: bool,

    /// Certificate attribute as `name=value`. Can be repeated.
    #[clap(long = "attribute", value_parser = parse_attribute)]
    pub attributes: Vec<Attribute>,

    /// Like `--attribute`, embedded in the enrollment certificate.
    #[clap(long = "ecert-attribute", value_parser = parse_ecert_attribute)]
    pub ecert_attributes: Vec<Attribute>,

    #[clap(long = "async")]
    pub pending: bool,
}

#[derive(clap::Args, Debug)]
pub struct SubscribeArguments {
    /// Only print events with exactly this name.
    #[clap(long, conflicts_with = "event_pattern")]
    pub event_name: Option<String>,

    /// Only print events whose name matches this regular expression.
    #[clap(long)]
    pub event_pattern: Option<String>,
}

impl SubscribeArguments {
    pub fn filter(&self) -> Result<EventFilter> {
        Ok(match (&self.event_name, &self.event_pattern) {
            (Some(name), _) => EventFilter::Name(name.clone()),
            (None, Some(pattern)) => EventFilter::pattern(pattern)?,
            (None, None) => EventFilter::All,
        })
    }
}

fn parse_attribute(value: &str) -> Result<Attribute, String> {
    attribute(value, false)
}

fn parse_ecert_attribute(value: &str) -> Result<Attribute, String> {
    attribute(value, true)
}

fn attribute(value: &str, ecert: bool) -> Result<Attribute, String> {
    let (name, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {value:?}"))?;
    if name.trim().is_empty() {
        return Err("attribute name must not be empty".to_string());
    }
    Ok(Attribute {
        name: name.to_string(),
        value: value.to_string(),
        ecert,
    })
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            client,
            print_metrics,
            command,
        } = self;

        write!(f, "{}", logging)?;
        write!(f, "{}", client)?;
        writeln!(f, "print_metrics: {}", print_metrics)?;
        writeln!(f, "command: {:?}", command)?;
        Ok(())
    }
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
        } = self;

        writeln!(f, "log_filter: {}", log_filter)?;
        writeln!(f, "log_stderr_threshold: {}", log_stderr_threshold)?;
        writeln!(f, "use_json_logs: {}", use_json_logs)?;
        Ok(())
    }
}
