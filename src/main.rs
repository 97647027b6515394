use clap::{Parser, Subcommand};
use proofgen::pipeline::{self, BuildOptions, PipelineError, ProofContext};
use proofgen::{config, discover, events, output, vcs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("PROOFGEN_RELEASE_BUILD");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("PROOFGEN_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "proofgen")]
#[command(about = "Generate the proof log site from git tags")]
#[command(long_about = "\
Generate the proof log site from git tags

Every tag named <type>_<feature>_<YYYY-MM-DD> becomes one entry, where type
is evidence-sprint or ac-green. Documents are read from the tagged commit:

  proof/
  ├── AC.md        # Acceptance criteria
  ├── DEMO.md      # Demo notes; the first URL becomes the call to action
  └── DELTA.md     # What changed

Output (default public/proof/):

  index.html, index.json, proof.css, <tag>/index.html

Missing documents are shown as such; they never fail the build.

Run 'proofgen gen-config' to generate a documented proofgen.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Repository root (where proofgen.toml and .git live)
    #[arg(long, default_value = ".", global = true)]
    repo: PathBuf,

    /// Log debug output, including every git invocation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Regenerate the proof site: discover tags, write pages, emit the update event
    Build {
        /// Output directory (overrides `output` in proofgen.toml)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Publish only the newest N tags; invalid values mean no limit
        #[arg(long, allow_hyphen_values = true)]
        limit: Option<String>,

        /// Write index.json (default)
        #[arg(long, overrides_with = "no_json")]
        json: bool,

        /// Skip index.json
        #[arg(long, overrides_with = "json")]
        no_json: bool,
    },
    /// List proof tags in publication order without resolving them
    List,
    /// Print a stock proofgen.toml with all options documented
    GenConfig,
    /// Emit one event through the configured handler
    Emit {
        /// Event name, e.g. site.proof_updated@1.0
        event: String,
        /// JSON payload; invalid JSON becomes {}
        payload: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    match cli.command {
        Command::Build {
            out,
            limit,
            no_json,
            ..
        } => {
            let config = config::load_config(&cli.repo)?;
            init_thread_pool(&config.processing);
            let git = git_for(&cli.repo, &config);
            let sink = events::sink_for(&config.events);
            let out = out.unwrap_or_else(|| PathBuf::from(&config.output));
            let out_dir = resolve_output(&cli.repo, out);
            let options = BuildOptions {
                out_dir,
                limit: limit.as_deref().and_then(discover::parse_limit),
                write_json: !no_json,
            };
            let ctx = ProofContext {
                vcs: &git,
                sink: sink.as_ref(),
                config: &config,
                repo_root: &cli.repo,
            };
            let summary = pipeline::generate_proof_site(&ctx, &options)?;
            output::print_build_summary(&summary);
        }
        Command::List => {
            let config = config::load_config(&cli.repo)?;
            let git = git_for(&cli.repo, &config);
            let discovery = discover::discover_tags(&git, &config.tag_patterns)?;
            output::print_tag_list(&discovery);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Emit { event, payload } => {
            let config = config::load_config(&cli.repo)?;
            let payload = events::parse_payload(payload.as_deref());
            let sink = events::sink_for(&config.events);
            sink.emit(&event, &payload)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn git_for(repo: &Path, config: &config::ProofConfig) -> vcs::Git {
    vcs::Git::new(&config.git.binary, repo, config.git.timeout())
}

/// Relative output paths are taken from the repository root.
fn resolve_output(repo: &Path, out: PathBuf) -> PathBuf {
    if out.is_absolute() { out } else { repo.join(out) }
}
