//! CLI entry point for `inbox2html`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use inbox2html::batch::{self, FetchOptions};
use inbox2html::config::{self, Config};
use inbox2html::error::Inbox2HtmlError;
use inbox2html::index::{self, MessageIndex};
use inbox2html::mailbox::{ImapMailbox, ImapSettings};
use inbox2html::parser::mime::parse_message;
use inbox2html::render::{self, MessageMeta};

#[derive(Parser)]
#[command(
    name = "inbox2html",
    version,
    about = "Render unseen IMAP messages as standalone HTML files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every unseen message to HTML and write the message index
    Fetch(ServerArgs),
    /// Mark every message listed in the message index as seen
    Ack(ServerArgs),
    /// Render a single .eml file without contacting a server
    Render {
        /// Raw RFC 5322 message
        #[arg(value_name = "EML")]
        path: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the JSON metadata summary instead of HTML
        #[arg(long)]
        meta: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Server credentials and output location, usually supplied through the
/// environment.
#[derive(Args)]
struct ServerArgs {
    /// IMAP server host name
    #[arg(long, env = "INPUT_EMAIL_SERVER")]
    server: String,

    /// Login user
    #[arg(long, env = "INPUT_EMAIL_USER")]
    user: String,

    /// Login password
    #[arg(long, env = "INPUT_EMAIL_PASSWORD", hide_env_values = true)]
    password: String,

    /// Directory for rendered files and the message index
    #[arg(short, long, env = "INPUT_OUTPUT_FILE", value_name = "DIR")]
    output_dir: PathBuf,

    /// IMAPS port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Mailbox name (overrides the config file)
    #[arg(long)]
    mailbox: Option<String>,

    /// Network timeout in seconds, 0 to disable (overrides the config file)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Accepted for compatibility with older automation; ignored
    #[arg(long, env = "INPUT_MESSAGE_ID", hide = true)]
    message_id: Option<String>,
}

impl ServerArgs {
    fn imap_settings(&self, config: &Config) -> ImapSettings {
        if let Some(ref id) = self.message_id {
            tracing::debug!(message_id = %id, "Ignoring INPUT_MESSAGE_ID");
        }
        let mut imap = config.imap.clone();
        if let Some(port) = self.port {
            imap.port = port;
        }
        if let Some(ref mailbox) = self.mailbox {
            imap.mailbox = mailbox.clone();
        }
        if let Some(secs) = self.timeout {
            imap.timeout_secs = secs;
        }
        ImapSettings {
            host: self.server.clone(),
            port: imap.port,
            user: self.user.clone(),
            password: self.password.clone(),
            mailbox: imap.mailbox.clone(),
            timeout: imap.timeout(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Fetch(args) => cmd_fetch(&args, &config),
        Commands::Ack(args) => cmd_ack(&args, &config),
        Commands::Render { path, output, meta } => cmd_render(&path, output.as_deref(), meta),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = config::cache_dir(config);
    let log_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "inbox2html.log".into());

    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Fetch run: connect read-only, render unseen messages, write the index.
fn cmd_fetch(args: &ServerArgs, config: &Config) -> anyhow::Result<()> {
    let settings = args.imap_settings(config);
    let options = FetchOptions {
        index_file_name: config.output.index_file_name.clone(),
        max_stem_len: config.output.max_filename_len,
    };

    let start = Instant::now();
    let mut mailbox = ImapMailbox::connect(&settings, true)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Rendering [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let report = batch::run_fetch(
        &mut mailbox,
        &args.output_dir,
        &options,
        &|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        },
    )?;

    pb.finish_and_clear();

    use humansize::{format_size, BINARY};
    println!();
    println!("  Fetch complete:");
    println!("  {:<25} {}", "Unseen messages", report.unseen);
    println!("  {:<25} {}", "Rendered files", report.written.len());
    if report.skipped > 0 {
        println!("  {:<25} {}", "Skipped", report.skipped);
    }
    println!(
        "  {:<25} {}",
        "Output size",
        format_size(report.bytes_written, BINARY)
    );
    println!("  {:<25} {}", "Message index", report.index_path.display());
    println!("  {:<25} {:.2?}", "Elapsed", start.elapsed());
    println!();

    Ok(())
}

/// Acknowledge run: load the index, connect read-write, flag each message seen.
fn cmd_ack(args: &ServerArgs, config: &Config) -> anyhow::Result<()> {
    let index_path = index::index_path(&args.output_dir, &config.output.index_file_name);
    let message_index = MessageIndex::load(&index_path)?;

    let settings = args.imap_settings(config);
    let mut mailbox = ImapMailbox::connect(&settings, false)?;
    let report = batch::run_acknowledge(&mut mailbox, &message_index)?;

    println!();
    println!("  Acknowledge complete:");
    println!("  {:<25} {}", "Index entries", report.entries);
    println!("  {:<25} {}", "Marked as seen", report.marked);
    if !report.not_found.is_empty() {
        println!("  {:<25} {}", "Not found", report.not_found.len());
        for id in &report.not_found {
            println!("    {id}");
        }
    }
    println!();

    Ok(())
}

/// Render one message file to HTML or to its JSON metadata.
fn cmd_render(path: &Path, output: Option<&Path>, meta: bool) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let raw = std::fs::read(path).map_err(|e| Inbox2HtmlError::io(path, e))?;
    let message = parse_message(&raw)?;

    let rendered = if meta {
        MessageMeta::from_message(&message).to_json()?
    } else {
        render::render(&message).into_string()
    };

    match output {
        Some(out) => {
            std::fs::write(out, rendered).map_err(|e| Inbox2HtmlError::io(out, e))?;
            tracing::info!(path = %out.display(), "Wrote rendered message");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "inbox2html", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
