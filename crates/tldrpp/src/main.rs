use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tldrpp_core::cache::{FetchOptions, RefreshReport};
use tldrpp_core::config::materialize_default_config;
use tldrpp_core::runtime::{PathOverrides, ResolutionContext, Runtime};
use tldrpp_core::safety::{append_exec_log, is_destructive};
use tldrpp_core::{HttpPagesClient, Page, render_command};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tldrpp",
    version,
    about = "Search cached command pages and fill their placeholders into runnable commands"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    cache_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(short, long, global = true, help = "Log at debug level")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    config: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            cache_dir: cli.cache_dir.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Write the default config and download the page cache")]
    Init,
    #[command(about = "Re-download the index and every page")]
    Update,
    #[command(about = "Show resolved paths and cache statistics")]
    Status,
    Search(SearchArgs),
    Show(ShowArgs),
    Render(RenderArgs),
    Exec(ExecArgs),
}

#[derive(Debug, Args)]
struct SearchArgs {
    query: String,
    #[arg(short, long = "platform", value_name = "NAME", help = "Restrict to a platform (repeatable)")]
    platforms: Vec<String>,
    #[arg(long, help = "Print results as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    command: String,
    #[arg(long, help = "Print the parsed page as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct RenderArgs {
    command: String,
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_variable)]
    vars: Vec<(String, String)>,
}

#[derive(Debug, Args)]
struct ExecArgs {
    command: String,
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_variable)]
    vars: Vec<(String, String)>,
    #[arg(short, long, help = "Skip the destructive-command confirmation")]
    yes: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Init) => run_init(&runtime),
        Some(Commands::Update) => run_update(&runtime),
        Some(Commands::Status) => run_status(&runtime),
        Some(Commands::Search(args)) => run_search(&runtime, args),
        Some(Commands::Show(args)) => run_show(&runtime, args),
        Some(Commands::Render(args)) => run_render(&runtime, args),
        Some(Commands::Exec(args)) => run_exec(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("TLDRPP_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_init(options: &RuntimeOptions) -> Result<()> {
    let runtime = resolve_runtime(options)?;
    let wrote_config = materialize_default_config(&runtime.paths.config_path)?;
    let cache = runtime.page_cache();
    let client = HttpPagesClient::new(runtime.config.remote())?;
    let report = cache.initialize(&client, &fetch_options(&runtime))?;

    println!("tldrpp init");
    println!("config_path: {}", normalize_path(&runtime.paths.config_path));
    println!("wrote_config: {}", format_flag(wrote_config));
    println!("cache_dir: {}", normalize_path(&runtime.paths.cache_dir));
    print_refresh_report(&report);
    print_diagnostics(options, &runtime);
    Ok(())
}

fn run_update(options: &RuntimeOptions) -> Result<()> {
    let runtime = resolve_runtime(options)?;
    let cache = runtime.page_cache();
    let client = HttpPagesClient::new(runtime.config.remote())?;
    let report = cache.update(&client, &fetch_options(&runtime))?;

    println!("tldrpp update");
    println!("cache_dir: {}", normalize_path(&runtime.paths.cache_dir));
    print_refresh_report(&report);
    print_diagnostics(options, &runtime);
    Ok(())
}

fn run_status(options: &RuntimeOptions) -> Result<()> {
    let runtime = resolve_runtime(options)?;
    let stats = runtime.page_cache().cache_stats()?;
    let remote = runtime.config.remote();

    println!("cache status");
    println!("config_path: {}", normalize_path(&runtime.paths.config_path));
    println!("cache_dir: {}", normalize_path(&runtime.paths.cache_dir));
    println!("initialized: {}", format_flag(stats.initialized));
    println!("index_entries: {}", stats.index_entries);
    println!("cached_pages: {}", stats.cached_pages);
    for (platform, count) in &stats.by_platform {
        println!("  {platform}: {count}");
    }
    println!("index_url: {}", remote.index_url);
    println!("pages_base_url: {}", remote.pages_base_url);
    println!("platforms: {}", runtime.config.platforms().join(", "));
    print_diagnostics(options, &runtime);
    Ok(())
}

fn run_search(options: &RuntimeOptions, args: SearchArgs) -> Result<()> {
    let runtime = resolve_runtime(options)?;
    let platforms = if args.platforms.is_empty() {
        runtime.config.platforms()
    } else {
        args.platforms
    };
    let pages = runtime.page_cache().search_pages(&args.query, &platforms)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }
    if pages.is_empty() {
        println!("no pages match `{}`", args.query);
        return Ok(());
    }
    for page in &pages {
        println!("{} [{}] - {}", page.name, page.platform, page.description);
    }
    Ok(())
}

fn run_show(options: &RuntimeOptions, args: ShowArgs) -> Result<()> {
    let runtime = resolve_runtime(options)?;
    let page = runtime.page_cache().find_page(&args.command)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }
    print_page(&page);
    Ok(())
}

fn run_render(options: &RuntimeOptions, args: RenderArgs) -> Result<()> {
    let runtime = resolve_runtime(options)?;
    let page = runtime.page_cache().find_page(&args.command)?;
    let variables = args.vars.into_iter().collect::<HashMap<_, _>>();
    println!("{}", render_command(&page, &args.command, &variables)?);
    Ok(())
}

fn run_exec(options: &RuntimeOptions, args: ExecArgs) -> Result<()> {
    let runtime = resolve_runtime(options)?;
    let page = runtime.page_cache().find_page(&args.command)?;
    let variables = args.vars.into_iter().collect::<HashMap<_, _>>();
    let rendered = render_command(&page, &args.command, &variables)?;

    let destructive = is_destructive(&rendered, &runtime.config.destructive_commands());
    if destructive && runtime.config.confirm_destructive() && !args.yes && !confirm(&rendered)? {
        println!("Command cancelled.");
        return Ok(());
    }

    run_logged(&rendered, &runtime.paths.exec_log_path)
}

/// Run `command` through `sh -c`; only a successful run is appended to the exec log.
fn run_logged(command: &str, exec_log_path: &Path) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .with_context(|| format!("failed to spawn `{command}`"))?;
    if !status.success() {
        bail!(
            "command failed with exit code {}",
            status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "<signal>".to_string())
        );
    }
    if let Err(error) = append_exec_log(exec_log_path, command) {
        warn!(error = %error, "failed to append exec log");
    }
    Ok(())
}

fn confirm(command: &str) -> Result<bool> {
    println!("This command appears destructive: {command}");
    print!("Are you sure you want to execute it? (y/N): ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn print_page(page: &Page) {
    println!("{} [{}]", page.name, page.platform);
    println!("{}", page.description);
    if page.examples.is_empty() {
        println!("\n(no examples)");
        return;
    }
    for example in &page.examples {
        println!("\n- {}", example.description);
        println!("  {}", example.command_template);
        for placeholder in &example.placeholders {
            println!("    {{{{{}}}}}: {}", placeholder.name, placeholder.kind.as_str());
        }
    }
}

fn print_refresh_report(report: &RefreshReport) {
    if report.already_initialized {
        println!("already_initialized: yes (run `tldrpp update` to refresh)");
        return;
    }
    println!("index_entries: {}", report.total);
    println!("fetched_pages: {}", report.fetched);
    println!("skipped_pages: {}", report.skipped.len());
    for skipped in &report.skipped {
        println!(
            "  - {}/{}: {}",
            skipped.entry.platform, skipped.entry.name, skipped.reason
        );
    }
}

fn print_diagnostics(options: &RuntimeOptions, runtime: &Runtime) {
    if options.diagnostics {
        println!("\n[diagnostics]\n{}", runtime.paths.diagnostics());
    }
}

fn fetch_options(runtime: &Runtime) -> FetchOptions {
    FetchOptions {
        workers: runtime.config.remote().workers,
        ..FetchOptions::default()
    }
}

fn resolve_runtime(options: &RuntimeOptions) -> Result<Runtime> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        config: options.config.clone(),
        cache_dir: options.cache_dir.clone(),
    };
    Runtime::resolve(&context, &overrides)
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty variable name in `{raw}`"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
