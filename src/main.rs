//! CLI entry point for `mimeShell`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};

use mimeshell::config::Config;
use mimeshell::export::attachment::export_all_attachments;
use mimeshell::model::AttachmentInfo;
use mimeshell::{Message, PartId};

#[derive(Parser)]
#[command(
    name = "mimeshell",
    version,
    about = "Inspect, decode and re-serialize MIME email messages"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the part tree
    Tree {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show the headers of a part
    Headers {
        path: PathBuf,
        /// Part number as printed by `tree`
        #[arg(short, long, default_value_t = 0)]
        part: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print a text or HTML body
    Text {
        path: PathBuf,
        /// Which body of that kind, depth-first
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        #[arg(long)]
        html: bool,
        /// Decode with this charset instead of the declared one
        #[arg(long)]
        charset: Option<String>,
    },
    /// Extract all attachments
    Attachments {
        path: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show the signed range and digest of a multipart/signed message
    Signed { path: PathBuf },
    /// Parse and re-serialize a message
    Roundtrip {
        path: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mimeshell::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Tree { path, json } => cmd_tree(&path, json, &config),
        Commands::Headers { path, part, json } => cmd_headers(&path, part, json, &config),
        Commands::Text {
            path,
            index,
            html,
            charset,
        } => cmd_text(&path, index, html, charset.as_deref(), &config),
        Commands::Attachments { path, output } => cmd_attachments(&path, &output, &config),
        Commands::Signed { path } => cmd_signed(&path, &config),
        Commands::Roundtrip { path, output } => cmd_roundtrip(&path, &output, &config),
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

    let log_dir = mimeshell::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mimeshell.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn open_message(path: &Path, config: &Config) -> anyhow::Result<Message> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let mut msg = Message::open_with(path, config.parse_options())?;
    msg.set_normalize_newlines(config.decode.normalize_newlines);
    Ok(msg)
}

fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mimeshell", &mut std::io::stdout());
    Ok(())
}

fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print the part tree, depth-first.
fn cmd_tree(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let msg = open_message(path, config)?;
    let ids = msg.walk();

    if json {
        let items: Vec<serde_json::Value> = ids
            .iter()
            .map(|&id| {
                let ct = msg.content_type(id);
                serde_json::json!({
                    "part": id.index(),
                    "depth": msg.depth(id),
                    "content_type": ct.map(|c| c.essence()),
                    "charset": ct.and_then(|c| c.charset()),
                    "filename": msg.filename(id),
                    "encoded_size": msg.encoded_len(id),
                    "children": msg.part(id).map(|p| p.children().len()).unwrap_or(0),
                })
            })
            .collect();
        let output = serde_json::json!({
            "file": path.to_string_lossy(),
            "parts": items,
            "text_parts": msg.text_part_count(),
            "html_parts": msg.html_part_count(),
            "attachments": msg.attachment_count(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    for id in ids {
        let indent = "  ".repeat(msg.depth(id) + 1);
        let essence = msg
            .content_type(id)
            .map(|c| c.essence())
            .unwrap_or_default();
        let mut line = format!("{indent}[{}] {essence}", id.index());
        if let Some(charset) = msg.content_type(id).and_then(|c| c.charset()) {
            line.push_str(&format!("; charset={charset}"));
        }
        if let Some(name) = msg.filename(id) {
            line.push_str(&format!("  \"{name}\""));
        }
        let is_leaf = msg.part(id).is_some_and(|p| p.children().is_empty());
        if is_leaf {
            line.push_str(&format!("  ({})", format_size(msg.encoded_len(id), BINARY)));
        }
        println!("{line}");
    }
    println!();
    Ok(())
}

/// Print raw and decoded headers of one part.
fn cmd_headers(path: &Path, part: usize, json: bool, config: &Config) -> anyhow::Result<()> {
    let msg = open_message(path, config)?;
    let Some(id) = msg.walk().into_iter().find(|id| id.index() == part) else {
        anyhow::bail!("No part {part} in {}", path.display());
    };
    let Some(node) = msg.part(id) else {
        anyhow::bail!("No part {part} in {}", path.display());
    };

    if json {
        let items: Vec<serde_json::Value> = node
            .headers()
            .iter()
            .map(|h| {
                serde_json::json!({
                    "name": h.name(),
                    "raw": h.value(),
                    "parsed": h.parsed(msg.converter()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!();
    for h in node.headers().iter() {
        println!("  {:<25} {}", h.name(), h.value());
        let decoded = match h.parsed(msg.converter()) {
            mimeshell::HeaderValue::Text(text) => Some(text.clone()),
            mimeshell::HeaderValue::Addresses(list) => Some(list.to_string()),
            mimeshell::HeaderValue::Date(Some(date)) => Some(date.to_rfc2822()),
            _ => None,
        };
        if let Some(decoded) = decoded.filter(|d| *d != h.value()) {
            println!("  {:<25} {}", "", decoded);
        }
    }
    println!();
    Ok(())
}

fn cmd_text(
    path: &Path,
    index: usize,
    html: bool,
    charset: Option<&str>,
    config: &Config,
) -> anyhow::Result<()> {
    let mut msg = open_message(path, config)?;
    if charset.is_some() {
        msg.set_charset_override(charset);
    }
    let text = if html {
        msg.html_content(index)?
    } else {
        msg.text_content(index)?
    };
    println!("{text}");
    Ok(())
}

fn cmd_attachments(path: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    let msg = open_message(path, config)?;
    let infos = AttachmentInfo::collect(&msg);
    if infos.is_empty() {
        println!("  No attachments found.");
        return Ok(());
    }

    println!();
    for info in &infos {
        println!(
            "  {:<40} {:<30} {:>10}",
            info.filename,
            info.content_type,
            format_size(info.encoded_size, BINARY)
        );
    }

    let paths = export_all_attachments(&msg, output)?;
    println!();
    println!(
        "  Extracted {} attachment(s) to {}",
        paths.len(),
        output.display()
    );
    Ok(())
}

fn cmd_signed(path: &Path, config: &Config) -> anyhow::Result<()> {
    let msg = open_message(path, config)?;
    let Some(signed) = msg.signed() else {
        anyhow::bail!("{} is not a multipart/signed message", path.display());
    };

    let range = signed.signed_range()?;
    println!();
    println!("  {:<20} {}", "Part", signed.part());
    println!(
        "  {:<20} {}",
        "Protocol",
        signed.protocol().unwrap_or_default()
    );
    println!("  {:<20} {}", "Micalg", signed.micalg().unwrap_or_default());
    println!(
        "  {:<20} {}..{} ({} bytes)",
        "Signed range",
        range.start,
        range.end,
        range.len()
    );
    match signed.digest_hex() {
        Ok(hex) => println!("  {:<20} {hex}", "Digest"),
        Err(e) => println!("  {:<20} {e}", "Digest"),
    }
    match signed.signature_content() {
        Ok(sig) => {
            println!();
            println!("{}", String::from_utf8_lossy(&sig));
        }
        Err(e) => println!("  {:<20} {e}", "Signature"),
    }
    Ok(())
}

fn cmd_roundtrip(path: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    let msg = open_message(path, config)?;
    msg.save(output, &config.write_options())?;

    let written = std::fs::metadata(output)?.len();
    let reparsed = Message::open_with(output, config.parse_options())?;
    println!();
    println!("  {:<20} {}", "Output", output.display());
    println!("  {:<20} {}", "Size", format_size(written, BINARY));
    println!(
        "  {:<20} {} -> {}",
        "Parts",
        msg.walk().len(),
        reparsed.walk().len()
    );
    println!(
        "  {:<20} {}",
        "Root type",
        reparsed
            .content_type(PartId::ROOT)
            .map(|c| c.essence())
            .unwrap_or_default()
    );
    println!();
    Ok(())
}
