use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use exchange_calculator::{CalculatorProfile, EarningsInput, SavingsInput};
use exchange_gate::{unix_now, Gate, GateConfig, ServerVerifier};
use serde::Serialize;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod http_api;
mod metrics;
mod pages;
mod server;
mod server_security;

use metrics::{MetricsEventSink, MetricsExporter, SiteMetrics};
use server::AppState;

pub const PROFILE_ENV: &str = "EXCHANGE_CALCULATOR_PROFILE";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "exchange-site")]
#[command(about = "Gated data exchange site with savings and earnings calculators", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Calculator profile, JSON or TOML (env: EXCHANGE_CALCULATOR_PROFILE)
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the gated site, its pages and the calculator API over HTTP
    Serve(ServeArgs),

    /// Run a calculator once and print the estimate as JSON
    Calc(CalcArgs),

    /// Issue or inspect gate tokens (uses EXCHANGE_GATE_SECRET)
    Token(TokenArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:3000
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Allow binding to non-loopback addresses (requires a configured gate)
    #[arg(long)]
    public: bool,

    /// Serve Prometheus metrics on a separate listener, e.g. 127.0.0.1:9464
    #[arg(long)]
    metrics_bind: Option<String>,

    /// Gate cookie name (env: EXCHANGE_GATE_COOKIE)
    #[arg(long)]
    cookie_name: Option<String>,
}

#[derive(Args)]
struct CalcArgs {
    #[command(subcommand)]
    command: CalcCommands,
}

#[derive(Subcommand)]
enum CalcCommands {
    /// Brand savings for an annual budget and team size
    Savings(BudgetArgs),

    /// Current spend versus spend on the exchange
    Cost(BudgetArgs),

    /// Provider earnings for selected phases and client counts
    Earnings(EarningsArgs),
}

#[derive(Args)]
struct BudgetArgs {
    /// Annual research budget in USD
    #[arg(long)]
    budget: f64,

    /// Team size bucket id, e.g. under10, 10to20, over20
    #[arg(long)]
    team_size: String,
}

#[derive(Args)]
struct EarningsArgs {
    /// Earnings variant id (defaults to the profile's first variant)
    #[arg(long)]
    variant: Option<String>,

    /// Workflow phase id to include (repeatable)
    #[arg(long = "phase")]
    phases: Vec<String>,

    /// Client count per tier as <tier>=<count> (repeatable)
    #[arg(long = "clients", value_parser = parse_tier_count)]
    clients: Vec<(String, u32)>,
}

#[derive(Args)]
struct TokenArgs {
    #[command(subcommand)]
    command: TokenCommands,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Sign a fresh token
    Issue {
        /// Lifetime in seconds (default: 24 hours)
        #[arg(long)]
        ttl_seconds: Option<u64>,
    },

    /// Check a token's signature and expiry
    Verify {
        /// Token value as stored in the cookie
        token: String,
    },
}

fn parse_tier_count(raw: &str) -> std::result::Result<(String, u32), String> {
    let (tier, count) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <tier>=<count>, got {raw:?}"))?;
    let tier = tier.trim();
    if tier.is_empty() {
        return Err(format!("missing tier id in {raw:?}"));
    }
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid count in {raw:?}: {err}"))?;
    Ok((tier.to_string(), count))
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Calculator and token commands write JSON to stdout; keep stderr quiet too.
    if !matches!(cli.command, Commands::Serve(_)) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Serve(args) => {
            let profile = load_profile(cli.profile.as_deref())?;
            serve(args, profile).await?
        }
        Commands::Calc(args) => {
            let profile = load_profile(cli.profile.as_deref())?;
            run_calc(args.command, &profile, cli.pretty)?
        }
        Commands::Token(args) => run_token(args.command, cli.pretty)?,
    }

    Ok(())
}

fn load_profile(flag: Option<&Path>) -> Result<CalculatorProfile> {
    let path = flag
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(PROFILE_ENV).map(PathBuf::from));
    let Some(path) = path else {
        return Ok(CalculatorProfile::reference());
    };

    let profile = CalculatorProfile::load(&path)
        .with_context(|| format!("Failed to load calculator profile {}", path.display()))?;
    log::info!("Loaded calculator profile '{}' from {}", profile.name, path.display());
    Ok(profile)
}

fn run_calc(command: CalcCommands, profile: &CalculatorProfile, pretty: bool) -> Result<()> {
    match command {
        CalcCommands::Savings(args) => {
            let input = SavingsInput::new(args.budget, &args.team_size);
            print_json(&profile.brand_savings(&input), pretty)
        }
        CalcCommands::Cost(args) => {
            let input = SavingsInput::new(args.budget, &args.team_size);
            print_json(&profile.cost_comparison(&input), pretty)
        }
        CalcCommands::Earnings(args) => {
            let input = EarningsInput::new(
                args.phases.iter().map(String::as_str),
                args.clients
                    .iter()
                    .map(|(tier, count)| (tier.as_str(), *count)),
            );
            let estimate = profile.earnings(args.variant.as_deref().unwrap_or_default(), &input);
            print_json(&estimate, pretty)
        }
    }
}

#[derive(Serialize)]
struct IssuedTokenReport {
    token: String,
    exp: u64,
    set_cookie: String,
}

#[derive(Serialize)]
struct TokenReport {
    signature_valid: bool,
    exp: Option<u64>,
    live: bool,
}

fn run_token(command: TokenCommands, pretty: bool) -> Result<()> {
    let config = GateConfig::from_env();
    match command {
        TokenCommands::Issue { ttl_seconds } => {
            let config = match ttl_seconds {
                Some(secs) => config.with_ttl(Duration::from_secs(secs)),
                None => config,
            };
            let gate = Gate::new(config);
            let issued = gate.issue_token(unix_now())?;
            let set_cookie = exchange_gate::session_cookie(
                gate.cookie_name(),
                &issued.value,
                gate.config().ttl,
            );
            print_json(
                &IssuedTokenReport {
                    token: issued.value,
                    exp: issued.exp,
                    set_cookie,
                },
                pretty,
            )
        }
        TokenCommands::Verify { token } => {
            let verifier = ServerVerifier::new(config.signing_secret()?)?;
            let verified = verifier.verify_now(token.trim());
            print_json(
                &TokenReport {
                    signature_valid: verified.is_some(),
                    exp: verified.map(|v| v.exp),
                    live: verified.is_some_and(|v| v.is_live(unix_now())),
                },
                pretty,
            )
        }
    }
}

async fn serve(args: ServeArgs, profile: CalculatorProfile) -> Result<()> {
    let addrs = server_security::resolve_guarded_bind_addrs(&args.bind, args.public).await?;
    let addr = server_security::choose_preferred_bind_addr(&addrs).ok_or_else(|| {
        anyhow::anyhow!("Bind address resolved to zero socket addrs: {}", args.bind)
    })?;

    let config = match args.cookie_name.as_deref() {
        Some(name) => GateConfig::from_env().with_cookie_name(name),
        None => GateConfig::from_env(),
    };
    server_security::ensure_gate_ready_for_public(&config, args.public)?;

    let metrics = SiteMetrics::new()?;
    let exporter = match args.metrics_bind.as_deref() {
        Some(bind) => {
            server_security::resolve_guarded_bind_addrs(bind, args.public).await?;
            Some(MetricsExporter::start(bind, metrics.clone()).await?)
        }
        None => None,
    };

    let gate = Gate::new(config).with_sink(Arc::new(MetricsEventSink::new(metrics.clone())));
    let state = Arc::new(AppState {
        gate,
        profile,
        metrics,
    });
    let app = server::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving site: {base_url}/"))?;
    print_stdout(&format!("Gate: {base_url}/gate"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    if let Some(exporter) = &exporter {
        print_stdout(&format!(
            "Metrics endpoint: http://{}/metrics",
            exporter.local_addr()
        ))?;
    }
    if !state.gate.config().is_complete() {
        print_stdout("Gate is not configured: every protected page will redirect to the gate")?;
    }
    if args.public {
        let addrs = addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        print_stdout(&format!(
            "Public bind enabled (--public). Resolved addresses: {addrs}"
        ))?;
    }
    log::info!(
        "Calculator profile '{}', gate cookie '{}'",
        state.profile.name,
        state.gate.cookie_name()
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tier_counts() {
        assert_eq!(
            parse_tier_count("micro=500").unwrap(),
            ("micro".to_string(), 500)
        );
        assert_eq!(
            parse_tier_count(" small = 50 ").unwrap(),
            ("small".to_string(), 50)
        );
        assert!(parse_tier_count("micro").is_err());
        assert!(parse_tier_count("=5").is_err());
        assert!(parse_tier_count("micro=-1").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
