//! nutri - nutrition-facts scraper
//!
//! Usage:
//!   nutri browsers              List installed browsers
//!   nutri collect-urls          Collect product URLs from every category
//!   nutri collect-nutrition     Extract nutrition tables for collected URLs
//!   nutri full                  Both of the above on one browser
//!   nutri quick-test            Small bounded run
//!   nutri files                 List generated files
//!   nutri clean                 Delete generated files
//!   nutri                       Interactive menu

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nutri_browser::DriverFactory;
use nutri_core::{BrowserKind, NutriConfig, NutriError};
use nutri_scraper::storage::{clean_outputs, list_outputs};
use nutri_scraper::{NutritionRun, Pipeline, UrlCollection};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "nutri")]
#[command(author, version, about = "Collects nutrition facts from a supplement catalogue")]
struct Cli {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "nutri.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Browser to drive (chrome, firefox, edge, opera)
    #[arg(long, value_name = "NAME", value_parser = parse_browser)]
    browser: Option<BrowserKind>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// List the browsers installed on this machine
    Browsers,

    /// Collect product URLs from every category
    CollectUrls,

    /// Extract nutrition facts for the collected URLs
    CollectNutrition,

    /// Collect URLs, then nutrition facts, on one browser
    Full,

    /// Bounded run over a few products
    QuickTest,

    /// List generated JSON and CSV files
    Files,

    /// Delete generated JSON and CSV files
    Clean {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// About this tool
    About,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Interactive menu
    Menu,
}

fn parse_browser(raw: &str) -> std::result::Result<BrowserKind, String> {
    raw.parse::<BrowserKind>().map_err(|e| e.to_string())
}

/// What every command needs
struct App {
    config_path: PathBuf,
    config: NutriConfig,
    browser: Option<BrowserKind>,
    headless: bool,
}

/// Line reader over stdin, shared by the menu and confirmations
type Input = Lines<BufReader<Stdin>>;

impl App {
    fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.clone(), self.browser, self.headless)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NutriConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    debug!("Configuration: {}", cli.config.display());

    let app = App {
        headless: config.browser.headless && !cli.headed,
        config_path: cli.config,
        config,
        browser: cli.browser,
    };

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => cmd_menu(&app, &mut input).await,
        command => run(&app, command, &mut input).await,
    }
}

async fn run(app: &App, command: Commands, input: &mut Input) -> Result<()> {
    match command {
        Commands::Browsers => cmd_browsers(app),
        Commands::CollectUrls => cmd_collect_urls(app).await,
        Commands::CollectNutrition => cmd_collect_nutrition(app).await,
        Commands::Full => cmd_full(app).await,
        Commands::QuickTest => cmd_quick_test(app).await,
        Commands::Files => cmd_files(app).await,
        Commands::Clean { yes } => cmd_clean(app, yes, input).await,
        Commands::About => {
            cmd_about(app);
            Ok(())
        }
        Commands::InitConfig { force } => cmd_init_config(&app.config_path, force),
        Commands::Menu => anyhow::bail!("The menu is already running"),
    }
}

fn cmd_browsers(app: &App) -> Result<()> {
    let factory = DriverFactory::new(app.config.browser.clone(), app.config.timing.clone());
    let available = factory.available();

    if available.is_empty() {
        println!("No compatible browser found. Install Chrome, Firefox, Edge or Opera.");
        return Ok(());
    }

    println!("Installed browsers");
    println!("==================");
    for descriptor in &available {
        let marker = if app.config.browser.preferred == Some(descriptor.kind) {
            " (preferred)"
        } else {
            ""
        };
        println!(
            "  {:<8} {}{}",
            descriptor.kind,
            descriptor.executable_path.display(),
            marker
        );
    }

    Ok(())
}

async fn cmd_collect_urls(app: &App) -> Result<()> {
    println!("Collecting product URLs");
    let collection = app
        .pipeline()
        .collect_urls()
        .await
        .context("URL collection failed")?;
    print_collection(&collection);
    Ok(())
}

async fn cmd_collect_nutrition(app: &App) -> Result<()> {
    println!("Collecting nutrition facts");
    let run = match app.pipeline().collect_nutrition().await {
        Ok(run) => run,
        Err(e @ NutriError::UrlFileMissing(_)) => {
            anyhow::bail!("{}. Use 'nutri collect-urls' first.", e)
        }
        Err(e) => return Err(e).context("Nutrition collection failed"),
    };
    print_run(&run);
    Ok(())
}

async fn cmd_full(app: &App) -> Result<()> {
    println!("Running URL collection and nutrition extraction");
    let run = app
        .pipeline()
        .full_pipeline()
        .await
        .context("Full run failed")?;
    print_run(&run);
    Ok(())
}

async fn cmd_quick_test(app: &App) -> Result<()> {
    let quick = &app.config.site.quick_test;
    println!(
        "Quick test: up to {} per category from {}, {} products at most",
        quick.per_category,
        quick.categories.join(", "),
        quick.max_products
    );
    let run = app
        .pipeline()
        .quick_test()
        .await
        .context("Quick test failed")?;
    print_run(&run);
    Ok(())
}

async fn cmd_files(app: &App) -> Result<()> {
    let data_dir = &app.config.paths.data_dir;
    let outputs = list_outputs(data_dir)
        .await
        .with_context(|| format!("Failed to list {}", data_dir.display()))?;

    if outputs.is_empty() {
        println!("No generated files in {}", data_dir.display());
        return Ok(());
    }

    println!("Generated files");
    println!("===============");
    for output in &outputs {
        let modified = output
            .modified
            .map(|m| m.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} ({:.1} KB) - {}",
            output.path.display(),
            output.size as f64 / 1024.0,
            modified
        );
    }

    Ok(())
}

async fn cmd_clean(app: &App, yes: bool, input: &mut Input) -> Result<()> {
    let data_dir = &app.config.paths.data_dir;
    let question = format!("Delete generated files in {}?", data_dir.display());
    if !yes && !confirm(input, &question).await? {
        println!("Nothing deleted");
        return Ok(());
    }

    let removed = clean_outputs(data_dir)
        .await
        .with_context(|| format!("Failed to clean {}", data_dir.display()))?;
    for path in &removed {
        println!("Removed {}", path.display());
    }
    println!("{} file(s) removed", removed.len());

    Ok(())
}

fn cmd_about(app: &App) {
    let site = &app.config.site;
    println!("nutri {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Drives an installed browser through the {} catalogue,", site.product_host);
    println!("collects product URLs per category and reads each product's");
    println!("nutrition table into a CSV file.");
    println!();
    println!("Categories:");
    for category in &site.categories {
        println!("  {:<14} {}", category.name, category.url);
    }
    println!();
    println!("URL file: {}", app.config.paths.urls_file.display());
    println!("CSV file: {}", app.config.paths.csv_file.display());
}

fn cmd_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    NutriConfig::write_default(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

const MENU: &str = "
  1. Collect product URLs
  2. Collect nutrition facts
  3. Full run (URLs + nutrition)
  4. Quick test
  5. List generated files
  6. Clean generated files
  7. About
  8. Exit";

/// Menu option number to command; `None` for exit
fn menu_command(choice: u8) -> Option<Commands> {
    match choice {
        1 => Some(Commands::CollectUrls),
        2 => Some(Commands::CollectNutrition),
        3 => Some(Commands::Full),
        4 => Some(Commands::QuickTest),
        5 => Some(Commands::Files),
        6 => Some(Commands::Clean { yes: false }),
        7 => Some(Commands::About),
        _ => None,
    }
}

/// Whether an operation error should end the menu
fn ends_menu(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<NutriError>(), Some(NutriError::Interrupted)))
}

async fn cmd_menu(app: &App, input: &mut Input) -> Result<()> {
    loop {
        println!("{}", MENU);
        prompt("\nChoose an option (1-8): ").await?;

        let line = match read_line(input).await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e) if ends_menu(&e) => {
                println!("\nInterrupted. Bye.");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let choice = match line.trim().parse::<u8>() {
            Ok(n) if (1..=8).contains(&n) => n,
            _ => {
                println!("Invalid option. Enter a number between 1 and 8.");
                continue;
            }
        };

        let Some(command) = menu_command(choice) else {
            println!("Bye.");
            return Ok(());
        };

        // Errors end the operation, not the menu, unless the user interrupted
        if let Err(e) = run(app, command, input).await {
            if ends_menu(&e) {
                println!("\nInterrupted. Bye.");
                return Ok(());
            }
            println!("Error: {:#}", e);
        }

        prompt("\nPress Enter to continue...").await?;
        match read_line(input).await {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(()),
            Err(e) if ends_menu(&e) => {
                println!("\nInterrupted. Bye.");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

async fn prompt(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Next input line; Ctrl-C while waiting yields [`NutriError::Interrupted`]
async fn read_line<R: AsyncBufRead + Unpin>(input: &mut Lines<R>) -> Result<Option<String>> {
    tokio::select! {
        line = input.next_line() => Ok(line?),
        _ = tokio::signal::ctrl_c() => Err(NutriError::Interrupted.into()),
    }
}

async fn confirm<R: AsyncBufRead + Unpin>(input: &mut Lines<R>, question: &str) -> Result<bool> {
    prompt(&format!("{} [y/N] ", question)).await?;
    let answer = read_line(input).await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim"))
}

fn print_collection(collection: &UrlCollection) {
    println!(
        "{} unique URLs saved to {}",
        collection.record.total,
        collection.path.display()
    );
    if !collection.duplicates.duplicated.is_empty() {
        println!("Listed in more than one category:");
        for (url, categories) in &collection.duplicates.duplicated {
            println!("  {} ({})", url, categories.join(", "));
        }
    }
}

fn print_run(run: &NutritionRun) {
    let report = &run.report;
    println!(
        "{} records ({} partial), {} failed",
        report.records.len(),
        report.partial,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.url, failure.error);
    }
    match &run.csv {
        Some(path) => println!("CSV written to {}", path.display()),
        None => println!("No records collected, no CSV written"),
    }
}
