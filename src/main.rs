use clap::{Args, Parser, Subcommand};
use simple_docs::generate::{self, BuildError};
use simple_docs::links::{LinkError, LinkPolicy};
use simple_docs::{config, output, scan, serve};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that validate links.
#[derive(Args, Clone)]
struct LinkArgs {
    /// Report broken links as warnings instead of failing
    #[arg(long)]
    lenient: bool,
}

#[derive(Parser)]
#[command(name = "simple-docs")]
#[command(about = "Documentation site generator for a folder of markdown files")]
#[command(long_about = "\
Documentation site generator for a folder of markdown files

Your filesystem is the data source. Folders become sections, markdown files
become pages, and file names become URLs.

Content structure:

  content/
  ├── config.toml                  # Site config (optional)
  ├── index.md                     # Home page (/)
  ├── about.md                     # /about/
  ├── guides/                      # /guides/ (listing generated, no index)
  │   ├── 01-installation.md       # /guides/installation/ (numbered = ordered)
  │   └── 02-configuration.md      # /guides/configuration/
  ├── posts/
  │   ├── index.md                 # /posts/
  │   ├── 2024-01-15-hello.md      # /posts/hello/ (dated = newest first)
  │   └── 2023-06-01-first.md      # /posts/first/
  └── .drafts/                     # Hidden = skipped

Links between pages:
  [[about]]                    wikilink, relative to the current folder
  [[/guides/installation]]     wikilink, from the content root
  [text](01-installation.md)   markdown link to a source file

Run 'simple-docs gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the content tree and the URL of every page
    Scan {
        /// Print the scanned site as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render every page and validate links without writing anything
    Check(LinkArgs),
    /// Render the site into the output directory
    Build(LinkArgs),
    /// Preview the content directory over HTTP, rendering on request
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Interface to bind (overrides config)
        #[arg(long)]
        interface: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut site_config = config::load_config(&cli.source)?;
    exclude_output_dir(&mut site_config, &cli.source, &cli.output);

    match cli.command {
        Command::Scan { json } => {
            let site = scan::scan(&cli.source, &site_config.content_filter())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&site)?);
            } else {
                output::print_scan_output(&site);
            }
        }
        Command::Check(args) => {
            println!("==> Checking {}", cli.source.display());
            let policy = link_policy(&args, &site_config);
            let report = reported(generate::check(&cli.source, &site_config, policy))?;
            output::print_check_output(&report);
        }
        Command::Build(args) => {
            println!("==> Building {} \u{2192} {}", cli.source.display(), cli.output.display());
            let policy = link_policy(&args, &site_config);
            let report = reported(generate::build(
                &cli.source,
                &cli.output,
                &site_config,
                policy,
            ))?;
            output::print_build_output(&report, &cli.output);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Serve { port, interface } => {
            if let Some(port) = port {
                site_config.serve.port = port;
            }
            if let Some(interface) = interface {
                site_config.serve.interface = interface;
            }
            site_config.validate()?;
            let (server, addr) = serve::bind(&site_config.serve)?;
            output::print_serve_banner(addr, &cli.source);
            serve::run(server, cli.source.clone(), site_config);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `--lenient` wins; otherwise `[links] strict` decides.
fn link_policy(args: &LinkArgs, config: &config::SiteConfig) -> LinkPolicy {
    if args.lenient {
        LinkPolicy::Lenient
    } else {
        LinkPolicy::from_strict(config.links.strict)
    }
}

/// Print the broken links of a strict failure before handing the error back.
fn reported(
    result: Result<generate::BuildReport, BuildError>,
) -> Result<generate::BuildReport, BuildError> {
    if let Err(BuildError::Links(LinkError::Broken(broken))) = &result {
        output::print_broken_links(broken);
    }
    result
}

/// Keep a build output nested in the content directory out of the scan.
fn exclude_output_dir(config: &mut config::SiteConfig, source: &Path, output: &Path) {
    let nested = output
        .parent()
        .zip(output.file_name())
        .filter(|(parent, _)| same_dir(parent, source));
    if let Some((_, name)) = nested {
        let name = name.to_string_lossy().into_owned();
        debug!("excluding output directory {name} from the content tree");
        if !config.exclude.contains(&name) {
            config.exclude.push(name);
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
