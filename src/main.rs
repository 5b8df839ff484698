//! cluster-connect - connect to a cluster with active/passive failover
//!
//! Endpoints, edition and credentials are read from the environment
//! (`<PREFIX>_ACTIVE_HOSTS`, `<PREFIX>_EDITION`, ...). The tool connects,
//! pings the selected endpoint and optionally runs one info command.

use anyhow::Result;
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cluster_connect::client::{Client, ClientState};
use cluster_connect::config::{
    CliArgs, ClientConfig, ConfigSource, EnvSource, LoadOptions, SecretsFile,
};
use cluster_connect::utils::{Error, ErrorReport, Logger};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

/// Outcome printed at the end of a run
#[derive(Debug, Serialize)]
struct Report {
    edition: String,
    state: ClientState,
    endpoint: Option<Vec<String>>,
    healthy: Option<bool>,
    response: Option<String>,
    error: Option<ErrorReport>,
}

impl Report {
    fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        println!("Edition:  {}", self.edition);
        println!("State:    {:?}", self.state);
        if let Some(ref endpoint) = self.endpoint {
            println!("Endpoint: {}", endpoint.join(", "));
        }
        if let Some(healthy) = self.healthy {
            println!("Healthy:  {}", healthy);
        }
        if let Some(ref response) = self.response {
            println!("Response:\n{}", response);
        }
        if let Some(ref error) = self.error {
            println!("\n{}", error);
        }
        Ok(())
    }
}

fn load_config(args: &CliArgs, logger: &Logger) -> Result<ClientConfig, Error> {
    let secrets = match args.secrets_file {
        Some(ref path) => Some(SecretsFile::open(path).map_err(|e| {
            Error::MissingRequiredCredential(format!("secrets file {}: {}", path.display(), e))
        })?),
        None => None,
    };

    let options = LoadOptions {
        prefix: &args.prefix,
        default_edition: args.default_edition,
    };
    ClientConfig::from_source(
        &EnvSource,
        secrets.as_ref().map(|s| s as &dyn ConfigSource),
        &options,
        logger,
    )
}

fn run(args: &CliArgs, logger: Logger) -> Result<bool> {
    let config = load_config(args, &logger)?;
    let mut client = Client::init(config, logger)?;

    let mut report = Report {
        edition: client.edition().to_string(),
        state: ClientState::Unconnected,
        endpoint: None,
        healthy: None,
        response: None,
        error: None,
    };

    let outcome = (|| -> Result<(), Error> {
        client.connect()?;
        report.healthy = Some(client.ping()?);
        if let Some(ref command) = args.command {
            let bytes = client.info(command)?;
            report.response = Some(String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(())
    })();

    report.state = client.state();
    report.endpoint = client.selected_endpoint().map(|e| e.addresses());
    if let Err(ref e) = outcome {
        report.error = Some(e.report());
    }
    client.close();

    report.print(args.json)?;

    Ok(outcome.is_ok() && report.healthy == Some(true))
}

fn main() {
    let args = CliArgs::parse_args();
    setup_logging(args.verbose, args.quiet);

    if let Err(msg) = args.validate() {
        eprintln!("error: {}", msg);
        std::process::exit(2);
    }

    match run(&args, Logger::tracing()) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(err) => eprintln!("{}", err.report()),
                None => eprintln!("error: {:#}", e),
            }
            std::process::exit(1);
        }
    }
}
