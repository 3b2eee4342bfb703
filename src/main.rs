// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

use subtrans::app_config::{Config, LogLevel, TranslationProvider};
use subtrans::app_controller::Controller;
use subtrans::jellyfin::JellyfinFlags;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "openai")]
    OpenAI,
    Ollama,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a subtitle file, a video, or a whole folder (default command)
    Translate(TranslateArgs),

    /// List the subtitle streams of a video file
    Streams {
        #[arg(value_name = "VIDEO")]
        video: PathBuf,
    },

    /// Extract a subtitle stream to SRT (the English one by default)
    Extract {
        #[arg(value_name = "VIDEO")]
        video: PathBuf,

        /// Stream index to extract
        #[arg(short, long)]
        stream: Option<usize>,
    },

    /// Rename subtitle files to Jellyfin naming
    Rename(RenameArgs),

    /// Shift every subtitle timing by a number of milliseconds (may be negative)
    Shift {
        #[arg(value_name = "SRT")]
        path: PathBuf,

        #[arg(value_name = "MILLIS", allow_negative_numbers = true)]
        millis: i64,
    },

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Input subtitle file, video file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Target language name or code (e.g. 'Spanish', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Subtitle entries per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Batches translated at the same time
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Translate only the first N entries (0 for no limit)
    #[arg(long)]
    block_limit: Option<usize>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Overwrite existing translations
    #[arg(short, long)]
    force: bool,
}

#[derive(Args, Debug)]
struct RenameArgs {
    #[arg(value_name = "FOLDER")]
    folder: PathBuf,

    /// Mark subtitles as default
    #[arg(long)]
    default: bool,

    /// Mark subtitles as forced
    #[arg(long)]
    forced: bool,

    /// Mark subtitles as SDH
    #[arg(long)]
    sdh: bool,

    /// Keep the original files next to the renamed copies
    #[arg(long)]
    keep_originals: bool,

    /// Only show what would be renamed
    #[arg(long)]
    dry_run: bool,
}

/// subtrans - batch subtitle translation with AI providers
///
/// Translates SRT files (or the English subtitle stream of a video) into another
/// language, batch by batch, and writes `<name>.<code>.srt` next to the input.
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "AI-powered batch subtitle translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "subtrans translates SRT subtitles in concurrent batches using AI providers.

EXAMPLES:
    subtrans movie.srt                          # Translate using the default config
    subtrans -t French movie.srt                # Translate into French
    subtrans -b 20 -j 5 /movies/                # Larger batches, more in flight
    subtrans -p ollama -m llama3.2:3b movie.mkv # Use a local model on a video's English track
    subtrans streams movie.mkv                  # List subtitle streams
    subtrans extract --stream 3 movie.mkv       # Extract stream 3 to SRT
    subtrans rename --default --dry-run /movies # Preview Jellyfin names
    subtrans shift movie.srt -- -1500           # Move every subtitle 1.5s earlier
    subtrans completions bash > subtrans.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Colored, timestamped stderr logger
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set with set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subtrans", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    match cli.command {
        None => run_translate(config, cli.translate).await,
        Some(Commands::Translate(args)) => run_translate(config, args).await,
        Some(Commands::Streams { video }) => {
            Controller::list_streams(&video).await.map(|_| ())
        }
        Some(Commands::Extract { video, stream }) => {
            Controller::extract(&video, stream).await.map(|_| ())
        }
        Some(Commands::Rename(args)) => {
            let flags = JellyfinFlags {
                default: args.default || config.jellyfin.default,
                forced: args.forced || config.jellyfin.forced,
                sdh: args.sdh || config.jellyfin.sdh,
            };
            let cleanup = config.jellyfin.cleanup_originals && !args.keep_originals;
            Controller::rename(&args.folder, &flags, cleanup, args.dry_run).map(|_| ())
        }
        Some(Commands::Shift { path, millis }) => {
            Controller::shift(&path, millis).map(|_| ())
        }
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

async fn run_translate(mut config: Config, args: TranslateArgs) -> Result<()> {
    let input_path = args
        .input_path
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    // Override config with CLI options if provided
    if let Some(target_language) = args.target_language {
        config.target_language = target_language;
    }
    if let Some(batch_size) = args.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    if let Some(concurrency) = args.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    if let Some(block_limit) = args.block_limit {
        config.pipeline.block_limit = Some(block_limit);
    }
    if let Some(provider) = args.provider {
        config.translation.provider = provider.into();
    }
    if let Some(model) = args.model {
        config.translation.model = model;
    }

    let controller = Controller::with_config(config)?;
    controller.run(input_path, args.force).await
}
