// crates/fixtrail-cli/src/main.rs
// ============================================================================
// Module: fixtrail CLI Entry Point
// Description: Command dispatcher for the fixtrail location-tracking agent.
// Purpose: Record, inspect, upload, and purge buffered fixes, and run tracking
//          sessions fed by an external sampler.
// Dependencies: clap, fixtrail-config, fixtrail-core, fixtrail-store-sqlite,
//               fixtrail-uplink, thiserror, time, tokio.
// ============================================================================

//! ## Overview
//! The fixtrail CLI owns the single sample store of an agent process and hands
//! shared handles to the sampling session and the upload coordinator. All
//! user-facing strings are routed through the i18n catalog.
//!
//! The process stays synchronous except for `track`, which builds a Tokio
//! runtime after the local UTC offset has been resolved. The blocking HTTP
//! client is only created and dropped outside async contexts.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use fixtrail_cli::i18n::Locale;
use fixtrail_cli::i18n::set_locale;
use fixtrail_cli::t;
use fixtrail_config::EventSinkKind;
use fixtrail_config::EventsConfig;
use fixtrail_config::FixtrailConfig;
use fixtrail_config::StoreConfig;
use fixtrail_config::validate_device_id;
use fixtrail_config::validate_server_url;
use fixtrail_core::EventSink;
use fixtrail_core::FileEventSink;
use fixtrail_core::Fix;
use fixtrail_core::JsonLinesSampler;
use fixtrail_core::NoopEventSink;
use fixtrail_core::SampleStore;
use fixtrail_core::Sampler;
use fixtrail_core::SamplingReport;
use fixtrail_core::SamplingSession;
use fixtrail_core::StderrEventSink;
use fixtrail_core::Timestamp;
use fixtrail_core::UploadCoordinator;
use fixtrail_core::UploadResult;
use fixtrail_store_sqlite::SqliteSampleStore;
use fixtrail_uplink::HttpTransport;
use thiserror::Error;
use time::UtcOffset;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable selecting the output language.
const LANG_ENV: &str = "FIXTRAIL_LANG";
/// Host identifier used as the device id when none is configured.
const MACHINE_ID_PATH: &str = "/etc/machine-id";
/// Maximum size of the machine id file.
const MAX_MACHINE_ID_BYTES: u64 = 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fixtrail", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `FIXTRAIL_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Config file path (defaults to `FIXTRAIL_CONFIG` or `fixtrail.toml`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Collector base URL (overrides `collector.server_url`).
    #[arg(long, value_name = "URL", global = true)]
    server_url: Option<String>,
    /// Device identifier (overrides `collector.device_id`).
    #[arg(long, value_name = "ID", global = true)]
    device_id: Option<String>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one fix to the sample store.
    Record(RecordCommand),
    /// Print stored fixes as JSON, newest first.
    List(ListCommand),
    /// Show the stored fix count and agent settings.
    Status,
    /// Upload every stored fix to the collector.
    Upload,
    /// Delete every stored fix without uploading.
    Clear(ClearCommand),
    /// Run a sampling session fed by JSON lines.
    Track(TrackCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `record`.
#[derive(Args, Debug)]
struct RecordCommand {
    /// Latitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    latitude: f64,
    /// Longitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    longitude: f64,
    /// Horizontal accuracy in meters.
    #[arg(long, default_value_t = 0.0)]
    accuracy: f32,
    /// Altitude in meters.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    altitude: f64,
    /// Ground speed in meters per second.
    #[arg(long, default_value_t = 0.0)]
    speed: f32,
    /// Capture time in unix milliseconds (defaults to now).
    #[arg(long, value_name = "MILLIS")]
    captured_at: Option<i64>,
}

/// Arguments for `list`.
#[derive(Args, Debug)]
struct ListCommand {
    /// Print at most this many fixes.
    #[arg(long)]
    limit: Option<usize>,
}

/// Arguments for `clear`.
#[derive(Args, Debug)]
struct ClearCommand {
    /// Confirm deletion of every stored fix.
    #[arg(long, action = ArgAction::SetTrue)]
    yes: bool,
}

/// Arguments for `track`.
#[derive(Args, Debug)]
struct TrackCommand {
    /// JSON lines file to read fixes from (defaults to stdin).
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
    /// Upload on this interval while tracking (overrides `upload.interval_secs`).
    #[arg(long, value_name = "SECS")]
    upload_interval_secs: Option<u64>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the resolved configuration.
    Check,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Portuguese.
    Pt,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Pt => Self::Pt,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    // The offset can only be read while the process is single-threaded.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    match run(offset) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(offset: UtcOffset) -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        emit_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = load_config(cli.config.as_deref(), cli.server_url.as_deref())?;
    let context = Context {
        config,
        offset,
        device_flag: cli.device_id,
    };

    match command {
        Commands::Record(command) => command_record(&context, &command),
        Commands::List(command) => command_list(&context, &command),
        Commands::Status => command_status(&context),
        Commands::Upload => command_upload(&context),
        Commands::Clear(command) => command_clear(&context, &command),
        Commands::Track(command) => command_track(&context, &command),
        Commands::Config {
            command: ConfigCommand::Check,
        } => command_config_check(&context),
    }
}

/// Prints CLI help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    emit_line("")
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Resolved settings shared by every command.
struct Context {
    /// Validated configuration with CLI overrides applied.
    config: FixtrailConfig,
    /// Offset used for wire timestamps.
    offset: UtcOffset,
    /// Device id passed on the command line.
    device_flag: Option<String>,
}

impl Context {
    /// Resolves the device id for uploads.
    fn device_id(&self) -> CliResult<String> {
        resolve_device_id(
            self.device_flag.as_deref(),
            self.config.collector.device_id.as_deref(),
            Path::new(MACHINE_ID_PATH),
        )
    }

    /// Opens the configured sample store.
    fn store(&self) -> CliResult<Arc<dyn SampleStore>> {
        let store: Arc<dyn SampleStore> = open_store(&self.config.store)?;
        Ok(store)
    }
}

/// Loads configuration and applies the server URL override.
fn load_config(path: Option<&Path>, server_url: Option<&str>) -> CliResult<FixtrailConfig> {
    let mut config = FixtrailConfig::load_or_default(path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    if let Some(server_url) = server_url {
        config.collector.server_url = resolve_server_url(server_url)?;
    }
    Ok(config)
}

/// Validates a server URL given on the command line.
fn resolve_server_url(value: &str) -> CliResult<String> {
    if value.trim().is_empty() {
        return Err(CliError::new(t!("collector.server_url.blank")));
    }
    validate_server_url(value)
        .map_err(|err| CliError::new(t!("collector.server_url.invalid", error = err)))
}

/// Resolves the device id from the flag, the config file, or the host
/// machine id, in that order.
fn resolve_device_id(
    flag: Option<&str>,
    configured: Option<&str>,
    machine_id_path: &Path,
) -> CliResult<String> {
    if let Some(value) = flag {
        return validate_device_id(value)
            .map_err(|err| CliError::new(t!("collector.device_id.invalid", error = err)));
    }
    if let Some(value) = configured {
        return Ok(value.to_string());
    }
    read_machine_id(machine_id_path).ok_or_else(|| {
        CliError::new(t!("collector.device_id.missing", path = machine_id_path.display()))
    })
}

/// Reads a host machine id, ignoring missing, oversized, or blank files.
fn read_machine_id(path: &Path) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    if metadata.len() > MAX_MACHINE_ID_BYTES {
        return None;
    }
    let text = fs::read_to_string(path).ok()?;
    validate_device_id(&text).ok()
}

/// Opens the `SQLite` sample store.
fn open_store(config: &StoreConfig) -> CliResult<Arc<SqliteSampleStore>> {
    SqliteSampleStore::new(&config.sqlite_config()).map(Arc::new).map_err(|err| {
        CliError::new(t!("store.open_failed", path = config.path.display(), error = err))
    })
}

/// Builds the configured event sink.
fn event_sink(config: &EventsConfig) -> CliResult<Arc<dyn EventSink>> {
    match config.sink {
        EventSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
        EventSinkKind::None => Ok(Arc::new(NoopEventSink)),
        EventSinkKind::File => {
            let Some(path) = config.path.as_deref() else {
                return Err(CliError::new(t!(
                    "config.load_failed",
                    error = "file events sink requires path"
                )));
            };
            let sink = FileEventSink::new(path).map_err(|err| {
                CliError::new(t!("events.open_failed", path = path.display(), error = err))
            })?;
            Ok(Arc::new(sink))
        }
    }
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Executes `record`.
fn command_record(context: &Context, command: &RecordCommand) -> CliResult<ExitCode> {
    let fix = Fix {
        latitude: command.latitude,
        longitude: command.longitude,
        accuracy: command.accuracy,
        altitude: command.altitude,
        speed: command.speed,
        captured_at: command.captured_at.map_or_else(Timestamp::now, Timestamp::from_unix_millis),
    };
    fix.validate().map_err(|err| CliError::new(t!("record.invalid", error = err)))?;
    let store = context.store()?;
    let id = store.append(&fix).map_err(|err| CliError::new(t!("store.write_failed", error = err)))?;
    emit_line(&t!("record.ok", id = id.get()))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `list`.
fn command_list(context: &Context, command: &ListCommand) -> CliResult<ExitCode> {
    let store = context.store()?;
    let mut fixes =
        store.read_all().map_err(|err| CliError::new(t!("store.read_failed", error = err)))?;
    if let Some(limit) = command.limit {
        fixes.truncate(limit);
    }
    let rendered = serde_json::to_string_pretty(&fixes)
        .map_err(|err| CliError::new(t!("list.render_failed", error = err)))?;
    emit_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `status`.
fn command_status(context: &Context) -> CliResult<ExitCode> {
    let store = context.store()?;
    let count = store.count().map_err(|err| CliError::new(t!("store.read_failed", error = err)))?;
    let config = &context.config;
    let cadence = config.sampling.cadence();
    let device = context.device_id().map_or_else(
        |_| t!("status.device.unset"),
        |device| t!("status.device", device = device),
    );
    let upload = match config.upload.interval_secs {
        Some(secs) => t!("status.upload.scheduled", secs = secs),
        None => t!("status.upload.manual"),
    };
    let metered = if config.upload.allow_metered {
        t!("status.metered.allowed")
    } else {
        t!("status.metered.confirm")
    };
    let lines = [
        t!("status.count", count = count),
        t!("status.server", url = config.collector.server_url),
        device,
        t!(
            "status.sampling",
            interval = cadence.interval_ms,
            fastest = cadence.fastest_interval_ms
        ),
        upload,
        metered,
    ];
    for line in lines {
        emit_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `clear`.
fn command_clear(context: &Context, command: &ClearCommand) -> CliResult<ExitCode> {
    let store = context.store()?;
    if !command.yes {
        let count =
            store.count().map_err(|err| CliError::new(t!("store.read_failed", error = err)))?;
        return Err(CliError::new(t!("clear.confirm_required", count = count)));
    }
    let removed =
        store.clear().map_err(|err| CliError::new(t!("store.write_failed", error = err)))?;
    emit_line(&t!("clear.ok", count = removed))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Upload Command
// ============================================================================

/// Executes `upload`.
fn command_upload(context: &Context) -> CliResult<ExitCode> {
    let uploader = Uploader::new(context, context.store()?, event_sink(&context.config.events)?)?;
    let (succeeded, message) = uploader.upload_once();
    if succeeded {
        emit_line(&message)?;
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(emit_error(&message))
    }
}

/// Upload coordinator bound to one collector and device.
#[derive(Clone)]
struct Uploader {
    /// Shared coordinator.
    coordinator: Arc<UploadCoordinator>,
    /// Collector base URL.
    server_url: String,
    /// Device identifier sent with every batch.
    device_id: String,
}

impl Uploader {
    /// Builds the HTTP transport and coordinator. Must not be called from an
    /// async context.
    fn new(
        context: &Context,
        store: Arc<dyn SampleStore>,
        events: Arc<dyn EventSink>,
    ) -> CliResult<Self> {
        let device_id = context.device_id()?;
        let transport = HttpTransport::new()
            .map_err(|err| CliError::new(t!("upload.client_failed", error = err)))?;
        let coordinator =
            UploadCoordinator::new(store, Arc::new(transport), events, context.offset);
        Ok(Self {
            coordinator: Arc::new(coordinator),
            server_url: context.config.collector.server_url.clone(),
            device_id,
        })
    }

    /// Runs one blocking upload and returns whether it succeeded together
    /// with the operator message.
    fn upload_once(&self) -> (bool, String) {
        match self.coordinator.upload(&self.server_url, &self.device_id) {
            Ok(result) => describe_upload(&result),
            Err(err) => (false, t!("upload.failed", error = err)),
        }
    }

    /// Uploads every `period` until `stop_rx` fires. Each attempt runs on the
    /// blocking pool.
    async fn run_every(self, period: Duration, mut stop_rx: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    let uploader = self.clone();
                    let outcome = tokio::task::spawn_blocking(move || uploader.upload_once()).await;
                    let message = match outcome {
                        Ok((_, message)) => message,
                        Err(err) => t!("upload.failed", error = err),
                    };
                    let _ = write_stderr_line(&message);
                }
            }
        }
    }
}

/// Maps an upload outcome to a success flag and operator message.
fn describe_upload(result: &UploadResult) -> (bool, String) {
    match result {
        UploadResult::Success(count) => (true, t!("upload.success", count = count)),
        UploadResult::Empty => (true, t!("upload.empty")),
        UploadResult::NetworkFailure(reason) => {
            (false, t!("upload.network_failure", error = reason))
        }
        UploadResult::ServerRejected(status) => {
            (false, t!("upload.server_rejected", status = status))
        }
    }
}

// ============================================================================
// SECTION: Track Command
// ============================================================================

/// Executes `track`.
fn command_track(context: &Context, command: &TrackCommand) -> CliResult<ExitCode> {
    let mut config = context.config.clone();
    if let Some(secs) = command.upload_interval_secs {
        config.upload.interval_secs = Some(secs);
        config.validate().map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    }
    let store = context.store()?;
    let events = event_sink(&config.events)?;
    let schedule = match config.upload.interval_secs {
        Some(secs) => Some((
            Uploader::new(context, Arc::clone(&store), Arc::clone(&events))?,
            Duration::from_secs(secs),
        )),
        None => None,
    };

    let reader: Box<dyn Read + Send> = match &command.input {
        Some(path) => Box::new(File::open(path).map_err(|err| {
            CliError::new(t!("track.input_failed", path = path.display(), error = err))
        })?),
        None => Box::new(std::io::stdin()),
    };
    let sampler = JsonLinesSampler::new(BufReader::new(reader), config.sampling.cadence());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(t!("track.runtime_failed", error = err)))?;
    let _ = write_stderr_line(&t!("track.started"));
    let report = runtime.block_on(track(sampler, store, events, schedule.clone()))?;
    drop(runtime);

    if let Some((uploader, _)) = &schedule {
        let (_, message) = uploader.upload_once();
        let _ = write_stderr_line(&message);
    }
    emit_line(&t!(
        "track.stopped",
        recorded = report.recorded,
        dropped = report.dropped,
        throttled = report.throttled
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Runs a sampling session until the input ends or Ctrl-C, with optional
/// scheduled uploads alongside.
async fn track<S>(
    sampler: S,
    store: Arc<dyn SampleStore>,
    events: Arc<dyn EventSink>,
    schedule: Option<(Uploader, Duration)>,
) -> CliResult<SamplingReport>
where
    S: Sampler + 'static,
{
    let session = SamplingSession::start(sampler, store, events)
        .map_err(|err| CliError::new(t!("track.start_failed", error = err)))?;
    let (stop_tx, stop_rx) = oneshot::channel();
    let uploads = schedule
        .map(|(uploader, period)| tokio::spawn(uploader.run_every(period, stop_rx)));
    let report = session.run_until(shutdown_signal()).await;
    let _ = stop_tx.send(());
    if let Some(uploads) = uploads {
        let _ = uploads.await;
    }
    Ok(report)
}

/// Resolves on Ctrl-C. Never resolves when the handler cannot be installed.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes `config check`.
fn command_config_check(context: &Context) -> CliResult<ExitCode> {
    let config = &context.config;
    emit_line(&t!(
        "config.check.ok",
        server = config.collector.server_url,
        store = config.store.path.display()
    ))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stdout, mapping failures to a localized error.
fn emit_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
