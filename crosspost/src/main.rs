//! crosspost - publish one post to Mastodon, Twitter and Bluesky

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use libcrosspost::logging::{LogFormat, LoggingConfig};
use libcrosspost::platforms::create_platform;
use libcrosspost::secret::PromptSecret;
use libcrosspost::types::validate_image_paths;
use libcrosspost::{Completed, Config, CrosspostError, Loaded, PlatformSelection, Post};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "crosspost")]
#[command(version, about = "Publish one post to Mastodon, Twitter and Bluesky")]
#[command(long_about = r#"Publish one post to Mastodon, Twitter and Bluesky.

The input file is a JSON object:

    {
      "post": "Release day!",
      "mastodon_mentions": "@alice@mastodon.social",
      "twitter_mentions": "@alice",
      "bluesky_mentions": "@alice.bsky.social"
    }

Each *_mentions value is appended on its own line for that platform only.
A file ending in .txt is posted verbatim.

EXAMPLES:
    # Post everywhere with two images
    crosspost post.json --images cat.png dog.jpg --all

    # Only Bluesky, machine-readable report
    crosspost post.json --bluesky --format json

CREDENTIALS:
    Read from the environment (a .env file is loaded first) or from
    $CROSSPOST_CONFIG / <config dir>/crosspost/config.toml:
    MASTODON_BASE_URL, MASTODON_ACCESS_TOKEN, TWITTER_API_KEY,
    TWITTER_API_SECRET, TWITTER_ACCESS_TOKEN, TWITTER_ACCESS_TOKEN_SECRET,
    BLUESKY_HANDLE, BLUESKY_PDS_URL. The Bluesky password is asked for
    interactively.

EXIT CODES:
    0 - Posted to every selected platform (or nothing selected)
    1 - At least one platform failed
    3 - Input file or image missing or invalid
"#)]
struct Cli {
    /// JSON post file (or .txt for plain text)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Images to attach, in order
    #[arg(long, value_name = "PATH", num_args = 1.., action = ArgAction::Append)]
    images: Vec<PathBuf>,

    /// Post to every platform
    #[arg(long)]
    all: bool,

    /// Post to Mastodon
    #[arg(long)]
    mastodon: bool,

    /// Post to Twitter
    #[arg(long)]
    twitter: bool,

    /// Post to Bluesky
    #[arg(long)]
    bluesky: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log format on stderr (text, json, pretty)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.log_format, cli.verbose).init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<CrosspostError>()
                .map(CrosspostError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    // Everything local is checked before any network call
    let post = Post::load(&cli.input, cli.images)?;
    validate_image_paths(post.image_paths())?;

    let selection = PlatformSelection::from_flags(cli.all, cli.mastodon, cli.twitter, cli.bluesky);
    if selection.is_empty() {
        println!(
            "No platform selected. Use --all, --mastodon, --twitter or --bluesky to choose where to post."
        );
        return Ok(0);
    }

    let config = Config::load()?;
    let format = cli.format;
    let loaded = Loaded::new(post, selection);
    debug!(targets = ?loaded.targets(), "Publishing post");

    let completed = loaded
        .run(|kind| {
            let line = format!("Posting to {}...", kind.display_name());
            match format {
                OutputFormat::Text => println!("{}", line),
                OutputFormat::Json => eprintln!("{}", line),
            }
            create_platform(kind, &config, Box::new(PromptSecret))
        })
        .await;

    match format {
        OutputFormat::Text => print_text_report(&completed),
        OutputFormat::Json => print_json_report(&completed)?,
    }

    Ok(completed.exit_code())
}

fn print_text_report(completed: &Completed) {
    for result in completed.results() {
        match (&result.post_id, &result.error) {
            (Some(post_id), _) if result.ok => println!("✓ {}: {}", result.platform, post_id),
            (_, Some(error)) => println!("✗ {}: {}", result.platform, error),
            _ => println!("✗ {}", result.platform),
        }
    }

    if completed.all_succeeded() {
        println!("Post successfully published to all selected platforms!");
    } else {
        let failed: Vec<&str> = completed.failures().map(|r| r.platform.as_str()).collect();
        println!("Failed to publish to: {}", failed.join(", "));
    }
}

fn print_json_report(completed: &Completed) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(completed.results())
        .context("Failed to serialize results")?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json).context("Failed to write results")?;
    Ok(())
}
