// # nsot-sync
//
// One-shot command that describes the local host and reconciles it into an
// NSoT site.
//
// The binary is a thin integration layer: it parses flags, builds the
// configuration, registers the built-in drivers and hands over to
// `nsot_sync_core::SyncEngine`. No reconciliation logic lives here.
//
// ## Configuration
//
// Every inventory flag has an environment fallback:
//
// - `NSOT_URL`: NSoT base URL, e.g. `https://nsot.example.com`
// - `NSOT_EMAIL`: user email
// - `NSOT_SECRET_KEY`: secret key (`auth_token` only)
// - `NSOT_AUTH_METHOD`: `auth_token` (default) or `auth_header`
// - `NSOT_AUTH_HEADER`: header carrying the email (default `X-NSoT-Email`)
// - `NSOT_TIMEOUT`: request timeout in seconds (default 30)
// - `NSOT_SYNC_SITE_ID`: site id (default 1)
// - `NSOT_SYNC_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// Logs go to stderr. In `--noop` mode the planned document is printed to
// stdout as JSON.
//
// ## Example
//
// ```bash
// export NSOT_URL=https://nsot.example.com
// export NSOT_EMAIL=ops@example.com
// export NSOT_SECRET_KEY=...
//
// nsot-sync --site-id 3 --device-attr rack=r12 facter
// ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nsot_sync_core::config::AuthMethod;
use nsot_sync_core::model::ResourceKind;
use nsot_sync_core::{
    AttributeOverlays, CollectorConfig, DriverRegistry, InventoryConfig, PrefixMode, SyncConfig,
    SyncEngine, SyncOutcome, TracingNotifier,
};
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible outcomes of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// Run completed (individual resources may have failed)
    Success = 0,
    /// Invalid flags, configuration or startup failure
    ConfigError = 1,
    /// Collection failed or the inventory became unreachable
    RuntimeError = 2,
    /// Resources were attempted and none succeeded
    NothingSucceeded = 3,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Reconcile this host's devices, networks and interfaces into NSoT
#[derive(Debug, Parser)]
#[command(name = "nsot-sync", version, about)]
struct Cli {
    /// Collect and ensure attributes, then print the document instead of writing it
    #[arg(long)]
    noop: bool,

    /// Site every resource belongs to
    #[arg(
        short,
        long,
        env = "NSOT_SYNC_SITE_ID",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    site_id: u64,

    /// Static device attribute, `key=value` (repeatable)
    #[arg(long = "device-attr", value_name = "KEY=VALUE")]
    device_attrs: Vec<String>,

    /// Static network attribute, `key=value` (repeatable)
    #[arg(long = "network-attr", value_name = "KEY=VALUE")]
    network_attrs: Vec<String>,

    /// Static interface attribute, `key=value` (repeatable)
    #[arg(long = "interface-attr", value_name = "KEY=VALUE")]
    interface_attrs: Vec<String>,

    /// Log level
    #[arg(
        long,
        env = "NSOT_SYNC_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"],
        ignore_case = true
    )]
    log_level: String,

    #[command(flatten)]
    inventory: InventoryArgs,

    #[command(subcommand)]
    driver: Driver,
}

#[derive(Debug, Args)]
struct InventoryArgs {
    /// NSoT base URL
    #[arg(long, env = "NSOT_URL")]
    url: Option<String>,

    /// NSoT user email
    #[arg(long, env = "NSOT_EMAIL")]
    email: Option<String>,

    /// NSoT secret key
    #[arg(long, env = "NSOT_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// How to authenticate against NSoT
    #[arg(long, env = "NSOT_AUTH_METHOD", value_enum, default_value_t = AuthArg::AuthToken)]
    auth_method: AuthArg,

    /// Header carrying the email for `auth_header`
    #[arg(long, env = "NSOT_AUTH_HEADER", default_value = "X-NSoT-Email")]
    auth_header: String,

    /// Request timeout in seconds
    #[arg(long, env = "NSOT_TIMEOUT", default_value_t = 30)]
    timeout: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum AuthArg {
    AuthToken,
    AuthHeader,
}

impl From<AuthArg> for AuthMethod {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::AuthToken => AuthMethod::AuthToken,
            AuthArg::AuthHeader => AuthMethod::AuthHeader,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PrefixArg {
    /// One /32 or /128 network per address
    Host,
    /// The prefix length configured on the interface
    Interface,
}

impl From<PrefixArg> for PrefixMode {
    fn from(arg: PrefixArg) -> Self {
        match arg {
            PrefixArg::Host => PrefixMode::Host,
            PrefixArg::Interface => PrefixMode::Interface,
        }
    }
}

#[derive(Debug, Args)]
struct LocalArgs {
    /// Prefix length policy for collected addresses
    #[arg(long, value_enum, default_value_t = PrefixArg::Host)]
    prefix_mode: PrefixArg,

    /// Skip interfaces starting with this prefix (repeatable, replaces the defaults)
    #[arg(long = "ignore-prefix", value_name = "PREFIX")]
    ignore_prefixes: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Driver {
    /// Describe the host from its network interfaces
    Simple(LocalArgs),

    /// Like `simple`, plus device attributes from facter facts
    #[cfg(feature = "facter")]
    Facter {
        #[command(flatten)]
        local: LocalArgs,

        /// Command that prints facts as JSON
        #[arg(long, default_value = "facter -p --json")]
        command: String,
    },
}

impl Cli {
    /// Build the run configuration from flags and environment
    fn sync_config(&self) -> Result<SyncConfig> {
        let mut overlays = AttributeOverlays::new();
        for (kind, pairs) in [
            (ResourceKind::Device, &self.device_attrs),
            (ResourceKind::Network, &self.network_attrs),
            (ResourceKind::Interface, &self.interface_attrs),
        ] {
            for pair in pairs {
                overlays.insert_pair(kind, pair)?;
            }
        }

        Ok(SyncConfig::new(self.collector_config(), self.inventory.inventory_config()?)
            .with_site_id(self.site_id)
            .with_noop(self.noop)
            .with_overlays(overlays))
    }

    fn collector_config(&self) -> CollectorConfig {
        let (mut config, local) = match &self.driver {
            Driver::Simple(local) => (CollectorConfig::simple(), local),
            #[cfg(feature = "facter")]
            Driver::Facter { local, command } => {
                let mut config = CollectorConfig::facter();
                if let CollectorConfig::Facter { command: cmd, .. } = &mut config {
                    cmd.clone_from(command);
                }
                (config, local)
            }
        };

        if !local.ignore_prefixes.is_empty()
            && let CollectorConfig::Simple { ignore_prefixes, .. }
            | CollectorConfig::Facter { ignore_prefixes, .. } = &mut config
        {
            ignore_prefixes.clone_from(&local.ignore_prefixes);
        }

        config.with_prefix_mode(local.prefix_mode.into())
    }
}

impl InventoryArgs {
    fn inventory_config(&self) -> Result<InventoryConfig> {
        let Some(url) = self.url.clone() else {
            anyhow::bail!("NSoT URL is required. Set it via --url or: export NSOT_URL=https://nsot.example.com");
        };
        let Some(email) = self.email.clone() else {
            anyhow::bail!("NSoT email is required. Set it via --email or: export NSOT_EMAIL=you@example.com");
        };

        Ok(InventoryConfig::Nsot {
            url,
            email,
            secret_key: self.secret_key.clone(),
            auth_method: self.auth_method.into(),
            auth_header: self.auth_header.clone(),
            timeout_secs: self.timeout,
        })
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                SyncExitCode::ConfigError.into()
            } else {
                SyncExitCode::Success.into()
            };
        }
    };

    // Initialize tracing
    let log_level = cli.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    let config = match cli.sync_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Remote calls are strictly sequential
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    rt.block_on(run(config)).into()
}

/// Register the built-in drivers
fn registry() -> DriverRegistry {
    let registry = DriverRegistry::new();
    nsot_sync_client::register(&registry);
    nsot_sync_simple::register(&registry);
    #[cfg(feature = "facter")]
    nsot_sync_facter::register(&registry);
    registry
}

/// Run one sync and map its outcome to an exit code
async fn run(config: SyncConfig) -> SyncExitCode {
    let registry = registry();
    debug!("Registered collectors: {}", registry.list_collectors().join(", "));

    let engine = match build_engine(&registry, &config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Startup error: {}", e);
            return SyncExitCode::ConfigError;
        }
    };

    info!(
        "Starting nsot-sync for site {}{}",
        engine.site_id(),
        if engine.is_noop() { " (noop)" } else { "" }
    );

    match engine.run().await {
        Ok(SyncOutcome::Planned(document)) => match serde_json::to_string_pretty(&document) {
            Ok(json) => {
                println!("{}", json);
                SyncExitCode::Success
            }
            Err(e) => {
                error!("Failed to render planned document: {}", e);
                SyncExitCode::RuntimeError
            }
        },
        Ok(SyncOutcome::Reconciled(report)) => {
            info!("{}", report);
            if report.is_total_failure() {
                warn!("{} resources attempted, none succeeded", report.attempted());
                SyncExitCode::NothingSucceeded
            } else {
                SyncExitCode::Success
            }
        }
        Err(e) => {
            error!("Sync aborted: {}", e);
            SyncExitCode::RuntimeError
        }
    }
}

fn build_engine(registry: &DriverRegistry, config: &SyncConfig) -> Result<SyncEngine> {
    let collector = registry.create_collector(&config.collector)?;
    let client = registry.create_inventory_client(&config.inventory)?;
    Ok(SyncEngine::new(
        collector,
        client,
        Box::new(TracingNotifier::new()),
        config,
    )?)
}
