use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use ugoira_convert::{Context, OutputFormat, ProgressEvent, UgoiraError, parse_post_id};

#[derive(Parser, Debug)]
#[command(
    name = "ugoira-convert",
    version,
    about = "Convert a Pixiv ugoira into an animated GIF or a WebM"
)]
struct Cli {
    /// `[URL] [OUT]`: the artwork URL ([http(s)://]www.pixiv.net/en/artworks/<ID>) unless
    /// --id, --meta or --ugoira is given, then the output file or directory.
    #[arg(value_name = "URL|OUT", num_args = 0..=2)]
    positional: Vec<String>,

    /// User-Agent sent to Pixiv.
    #[arg(short = 'u', long)]
    user_agent: Option<String>,

    /// Pixiv session ID, sent as the PHPSESSID cookie.
    #[arg(short = 's', long, env = "UGCONV_SESSION_ID", hide_env_values = true)]
    session_id: Option<String>,

    /// Output format. Defaults to the output extension, else webm.
    #[arg(long, value_enum)]
    fmt: Option<FormatChoice>,

    /// Self-contained ugoira archive (frames + animation.json).
    #[arg(long, conflicts_with_all = ["meta", "id"])]
    ugoira: Option<PathBuf>,

    /// Pre-downloaded ugoira meta JSON.
    #[arg(long)]
    meta: Option<PathBuf>,

    /// Pre-downloaded frames ZIP (requires --meta).
    #[arg(long, requires = "meta")]
    zip: Option<PathBuf>,

    /// Numeric post ID.
    #[arg(long, value_parser = parse_id_arg, conflicts_with = "meta")]
    id: Option<u64>,

    /// Suppress progress output.
    #[arg(short, long)]
    quiet: bool,

    /// Log debug diagnostics to stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Gif,
    Webm,
}

impl From<FormatChoice> for OutputFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Gif => OutputFormat::Gif,
            FormatChoice::Webm => OutputFormat::Webm,
        }
    }
}

fn parse_id_arg(s: &str) -> Result<u64, String> {
    parse_post_id(s).ok_or_else(|| "should be a non-negative integer".to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            let code = e
                .downcast_ref::<UgoiraError>()
                .map(|u| u.kind().exit_code())
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut ctx = Context::new();

    if let Some(ua) = cli.user_agent {
        ctx.set_user_agent(ua);
    }
    if let Some(sid) = cli.session_id {
        ctx.set_session_id(sid);
    }

    let mut positional = cli.positional.into_iter();

    if let Some(ugoira) = cli.ugoira {
        ctx.set_ugoira(ugoira)?;
    }
    if let Some(meta) = cli.meta.as_deref() {
        ctx.set_meta_path(meta)?;
    }
    if let Some(zip) = cli.zip {
        ctx.set_zip(zip)?;
    }
    if let Some(id) = cli.id {
        ctx.set_post_id(id)?;
    }

    if ctx.input().is_empty() {
        let url = positional
            .next()
            .context("Expected an artwork URL (or one of --id, --meta, --ugoira)")?;
        ctx.set_post_url(&url)?;
    }

    let out = positional.next().map(PathBuf::from);
    if let Some(extra) = positional.next() {
        anyhow::bail!("Unexpected argument '{extra}'");
    }

    let fmt = determine_format(out.as_deref(), cli.fmt.map(OutputFormat::from))?;
    let dest = resolve_output(out, fmt, ctx.post_id());

    ctx.show_progress(!cli.quiet);
    let mut term = TerminalProgress::default();
    ctx.set_progress_sink(move |ev| term.handle(ev));

    ctx.convert(&dest, fmt)?;
    Ok(())
}

/// `--fmt` wins, then the output extension, then WebM.
fn determine_format(out: Option<&Path>, flag: Option<OutputFormat>) -> anyhow::Result<OutputFormat> {
    if let Some(fmt) = flag {
        return Ok(fmt);
    }

    let Some(out) = out.filter(|p| !p.is_dir()) else {
        return Ok(OutputFormat::Webm);
    };

    match out.extension() {
        None => Ok(OutputFormat::Webm),
        Some(ext) => {
            let ext = ext.to_string_lossy();
            OutputFormat::from_extension(&ext)
                .with_context(|| format!("Unrecognized extension .{ext}"))
        }
    }
}

/// A missing output or a directory gets `<post_id>.<ext>` (or `out.<ext>`).
fn resolve_output(out: Option<PathBuf>, fmt: OutputFormat, post_id: Option<u64>) -> PathBuf {
    let name = match post_id {
        Some(id) => format!("{id}.{}", fmt.extension()),
        None => format!("out.{}", fmt.extension()),
    };

    match out {
        Some(dir) if dir.is_dir() => dir.join(name),
        Some(file) => file,
        None => PathBuf::from(name),
    }
}

#[derive(Default)]
struct TerminalProgress {
    bar: Option<ProgressBar>,
}

impl TerminalProgress {
    fn handle(&mut self, ev: ProgressEvent) {
        match ev {
            ProgressEvent::Message(text) => println!("{text}"),
            ProgressEvent::Starting(label) => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.green} {msg} {bytes}")
                        .expect("valid spinner template"),
                );
                bar.enable_steady_tick(Duration::from_millis(120));
                bar.set_message(label);
                self.bar = Some(bar);
            }
            ProgressEvent::Bytes { total, now } => {
                let Some(bar) = self.bar.as_ref() else {
                    return;
                };
                if total > 0 && bar.length() != Some(total) {
                    bar.set_length(total);
                    bar.set_style(
                        ProgressStyle::with_template(
                            "[{percent:>3}%] {msg} {wide_bar:.cyan/blue} {bytes}/{total_bytes}",
                        )
                        .expect("valid bar template"),
                    );
                }
                bar.set_position(now);
            }
            ProgressEvent::Finished => {
                if let Some(bar) = self.bar.take() {
                    bar.finish();
                }
            }
        }
    }
}
