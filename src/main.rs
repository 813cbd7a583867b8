//! Command line entry point: render, tag and audit a site.

use std::io::{
    self,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;

use clap::{
    Parser,
    Subcommand,
};
use site_i18n::SiteRenderer;
use site_i18n::audit::audit_site;
use site_i18n::config::ConfigManager;
use site_i18n::dom::Document;
use site_i18n::site::SiteError;
use site_i18n::tagger::AttributeTagger;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "site-i18n")]
#[command(version)]
#[command(about = "Tag, translate and pre-render the pages of a bilingual site")]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// What to do
    #[command(subcommand)]
    command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Render every page into <OUT>/<LANG>/
    Render {
        /// Site root (holds `.site-i18n.json` and the translations file)
        #[arg(value_name = "SITE")]
        site: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Languages to render (default: all)
        #[arg(short, long = "lang", value_name = "LANG")]
        languages: Vec<String>,

        /// Pages rendered at the same time
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },

    /// Add translation markers to one page
    Tag {
        /// Page to tag
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report keys missing from a language or from the translations file
    Audit {
        /// Site root
        #[arg(value_name = "SITE")]
        site: PathBuf,
    },
}

/// Installs the subscriber. The guard must live until exit when logging to a file.
fn init_tracing(log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("site_i18n=info"));

    let Some(log_file) = log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
        return Ok(None);
    };

    let directory = log_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(directory)?;
    let file_name = log_file.file_name().map_or_else(|| "site-i18n.log".into(), ToOwned::to_owned);
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(error) => {
            let _ = writeln!(io::stderr(), "failed to open log file: {error}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Render { site, out, languages, jobs } => render(&site, &out, &languages, jobs).await,
        Command::Tag { file, output } => tag(&file, output.as_deref()).await,
        Command::Audit { site } => audit(&site).await,
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(%error, "Command failed");
            let _ = writeln!(io::stderr(), "error: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Pre-renders the site and prints one line per output.
async fn render(
    site: &Path,
    out: &Path,
    languages: &[String],
    jobs: Option<usize>,
) -> Result<ExitCode, SiteError> {
    let mut renderer = SiteRenderer::open(site).await?;
    if let Some(jobs) = jobs {
        renderer = renderer.with_concurrency(jobs);
    }
    let report = renderer.render(out, languages).await?;

    let mut stdout = io::stdout().lock();
    for output in &report.outputs {
        let missing = output.render.as_ref().map_or(0, |render| render.missing.len());
        let _ = writeln!(stdout, "{} [{}] missing={missing}", output.output.display(), output.language);
    }
    for failure in &report.failures {
        let _ = writeln!(io::stderr(), "failed: {failure}");
    }
    tracing::info!(
        pages = report.tagging.len(),
        outputs = report.outputs.len(),
        missing = report.missing_count(),
        failures = report.failures.len(),
        "Render finished"
    );

    Ok(if report.failures.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Tags one page and writes the result.
async fn tag(file: &Path, output: Option<&Path>) -> Result<ExitCode, SiteError> {
    // 設定はページと同じディレクトリから探す
    let site_root = file.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut config = ConfigManager::new();
    config.load_settings(Some(site_root))?;
    let settings = config.get_settings();

    let source = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| SiteError::Io { path: file.to_path_buf(), source })?;
    let mut document =
        Document::parse(&source).map_err(|source| SiteError::Dom { path: file.to_path_buf(), source })?;

    let tagger = AttributeTagger::new(
        settings.effective_tag_rules(),
        settings.marker_attribute.clone(),
        settings.html_marker_attribute.clone(),
    );
    let report = tagger.run(&mut document);
    let html = document.to_html();

    match output {
        Some(path) => tokio::fs::write(path, html)
            .await
            .map_err(|source| SiteError::Io { path: path.to_path_buf(), source })?,
        None => {
            let _ = io::stdout().lock().write_all(html.as_bytes());
        }
    }

    Ok(if report.invalid_selectors.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints translation issues of the site.
async fn audit(site: &Path) -> Result<ExitCode, SiteError> {
    let issues = audit_site(site).await?;

    let mut stdout = io::stdout().lock();
    for issue in &issues {
        let _ = writeln!(stdout, "{issue}");
    }

    Ok(if issues.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
