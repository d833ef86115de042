use amplify_hook::aws::{AwsCliGateway, AwsSdkGateway, ProviderClient};
use amplify_hook::config::{effective_region, HookConfig};
use amplify_hook::context::DeploymentContext;
use amplify_hook::hook::{self, HookOptions, HookOutcome};
use amplify_hook::resource::CompiledTemplate;
use amplify_hook::VERSION;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const DEFAULT_TEMPLATE: &str = ".serverless/cloudformation-template-update-stack.json";

/// Write the Amplify client configuration for a deployed stack
#[derive(Parser, Debug)]
#[command(name = "amplify-hook", version, about, long_about = None)]
struct Args {
    /// Name of the deployed root stack
    #[arg(long)]
    stack: String,

    /// AWS region (defaults to AWS_REGION, then AWS_DEFAULT_REGION)
    #[arg(short, long)]
    region: Option<String>,

    /// Deployment stage, used in REST API endpoints
    #[arg(long, default_value = "dev")]
    stage: String,

    /// Compiled CloudFormation template
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Configuration block (YAML or JSON) listing the artifacts to generate
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// AWS shared-config profile
    #[arg(long)]
    profile: Option<String>,

    /// Call AWS through the `aws` command-line client instead of the SDK
    #[arg(long)]
    use_cli: bool,

    /// Directory artifact file names are relative to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Describe calls issued at once
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Timeout for a single provider call, in seconds
    #[arg(long, default_value_t = 60)]
    call_timeout: u64,

    /// Deadline for the whole run, in seconds
    #[arg(long, default_value_t = 300)]
    deadline: u64,

    /// Log level (overrides --verbose and SLS_DEBUG)
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Log progress at info level
    #[arg(short, long)]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Exit with status 1 when the configuration could not be generated
    #[arg(long)]
    fail_on_error: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }

    fn resolve(explicit: Option<LogLevel>, verbose: bool) -> LogLevel {
        if let Some(level) = explicit {
            return level;
        }
        if std::env::var_os("SLS_DEBUG").is_some() {
            LogLevel::Debug
        } else if verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }
}

/// Log destination; the log file if it can be opened, stderr otherwise
fn log_writer(log_file: Option<&Path>) -> (Box<dyn Write + Send>, Option<String>) {
    let Some(path) = log_file else {
        return (Box::new(std::io::stderr()), None);
    };

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => (Box::new(file), None),
        Err(e) => (
            Box::new(std::io::stderr()),
            Some(format!("Cannot open log file {}: {}, logging to stderr", path.display(), e)),
        ),
    }
}

fn setup_logging(level: LogLevel, log_file: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return None;
    };

    let (writer, fallback) = log_writer(log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(log_file.is_some() && fallback.is_none())
        .with_thread_ids(false)
        .init();

    if let Some(warning) = fallback {
        tracing::warn!("{}", warning);
    }
    tracing::debug!("amplify-hook {} started with log level: {:?}", VERSION, level);

    Some(guard)
}

fn load_template(path: &Path) -> Result<CompiledTemplate> {
    if !path.exists() && path == Path::new(DEFAULT_TEMPLATE) {
        tracing::warn!(
            "Compiled template {} not found, user pool clients cannot be resolved",
            path.display()
        );
        return Ok(CompiledTemplate::default());
    }
    Ok(CompiledTemplate::load(path)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(
        LogLevel::resolve(args.log_level, args.verbose),
        args.log_file.as_deref(),
    );

    let failed = match run(&args).await {
        Ok(outcome) => outcome.is_failed(),
        Err(err) => {
            tracing::error!("{:#}", err);
            true
        }
    };

    if failed && args.fail_on_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(args: &Args) -> Result<HookOutcome> {
    let region = effective_region(args.region.as_deref());
    tracing::info!("Using stack: {}, region: {}, stage: {}", args.stack, region, args.stage);

    let template = load_template(&args.template).context("Cannot load compiled template")?;
    let config = HookConfig::load(args.config.as_deref()).context("Cannot load configuration block")?;

    let context = DeploymentContext::new(&args.stack, &region, &args.stage).with_template(template);

    let client = if args.use_cli {
        ProviderClient::new(AwsCliGateway::new(&region).with_profile(args.profile.clone()))
    } else {
        ProviderClient::new(AwsSdkGateway::from_env(&region, args.profile.as_deref()).await)
    };
    let client = client.with_call_timeout(Duration::from_secs(args.call_timeout));

    let options = HookOptions {
        output_dir: args.output_dir.clone(),
        concurrency: args.concurrency.max(1),
        deadline: Duration::from_secs(args.deadline),
    };

    Ok(hook::after_deploy(&client, &context, &config, &options).await)
}
