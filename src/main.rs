//! docforge – generate invoice and delivery-note PDFs.
//!
//! Usage:
//!   docforge generate --type invoice --date 2025-03-07 --quantity 3 --unit-price 12.5
//!   docforge download --type delivery-note [--layout-json layout.json]
//!   docforge total --quantity 3 --unit-price 12.5
//!   docforge check
//!   docforge show-config
//!
//! Finished PDFs land in `--out` (default: the configured output directory)
//! and are never overwritten.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use doc_forge::acquisition::LoadedPage;
use doc_forge::config::{AppConfig, TemplateConfig};
use doc_forge::document::{DocumentType, FormInput};
use doc_forge::dom::find_by_id;
use doc_forge::export::{DirectorySink, ExportOutcome, PdfRasterizer, SystemClock};
use doc_forge::pipeline::{Exporter, DOWNLOAD_LABEL, GENERATE_LABEL};
use doc_forge::presentation::PresentationOverride;
use doc_forge::ui::{probe_capability, NotificationCenter, NotificationKind, TriggerControl};
use doc_forge::{calculate_total, DocumentError, Result};

#[derive(Parser)]
#[command(name = "docforge")]
#[command(version)]
#[command(about = "Generate invoice and delivery-note PDFs from HTML templates", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read templates from a directory instead of the embedded copies
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "template_url")]
    templates: Option<PathBuf>,

    /// Fetch templates over HTTP relative to this URL
    #[arg(long, global = true, value_name = "URL")]
    template_url: Option<String>,

    /// Output directory for finished PDFs
    #[arg(short, long, global = true, value_name = "DIR")]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a document from form values and export it
    Generate(FormArgs),

    /// Export a template page as it is displayed
    Download {
        /// Document type (invoice, delivery-note)
        #[arg(short = 't', long = "type", default_value = "invoice")]
        document_type: String,

        /// Also write the paginated layout as JSON
        #[arg(long, value_name = "FILE")]
        layout_json: Option<PathBuf>,
    },

    /// Print the total a form would produce
    Total(FormArgs),

    /// Check that PDF export is available
    Check,

    /// Print the effective configuration
    ShowConfig,
}

#[derive(Args)]
struct FormArgs {
    /// Document type (invoice, delivery-note)
    #[arg(short = 't', long = "type", default_value = "invoice")]
    document_type: String,

    /// Document date, YYYY-MM-DD (default: today)
    #[arg(short, long, default_value = "")]
    date: String,

    #[arg(short, long, default_value = "")]
    quantity: String,

    #[arg(short, long, default_value = "")]
    unit_price: String,
}

impl FormArgs {
    fn to_form(&self) -> FormInput {
        FormInput {
            document_type: self.document_type.clone(),
            date: self.date.clone(),
            quantity: self.quantity.clone(),
            unit_price: self.unit_price.clone(),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.templates {
        config.templates = TemplateConfig::Directory { path: dir.clone() };
    }
    if let Some(url) = &cli.template_url {
        config.templates = TemplateConfig::Http {
            base_url: url.clone(),
        };
    }
    if let Some(out) = &cli.out {
        config.output_dir = out.clone();
    }
    Ok(config)
}

/// Runs one command. `Ok(false)` means the command ran but the user saw a
/// failure notification.
fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::ShowConfig => {
            println!("{}", config.to_json()?);
            Ok(true)
        }
        Commands::Total(args) => {
            match calculate_total(&args.to_form()) {
                Some(total) => println!("${total}"),
                None => println!("(no pricing for this document type)"),
            }
            Ok(true)
        }
        Commands::Check => {
            let rasterizer = PdfRasterizer::from_options(&config.export)?;
            let mut control = TriggerControl::new(DOWNLOAD_LABEL);
            let mut center = NotificationCenter::new();
            let available = probe_capability(&rasterizer, &mut control, &mut center);
            print_notifications(&center);
            if available {
                println!("PDF export available ({})", config.templates.build().describe());
            }
            Ok(available)
        }
        Commands::Generate(args) => {
            let exporter = build_exporter(&config)?;
            let mut control = TriggerControl::new(GENERATE_LABEL);
            let mut sink = DirectorySink::new(&config.output_dir);
            let mut center = NotificationCenter::new();

            let outcome = exporter.generate(&args.to_form(), &mut control, &mut sink, &mut center);
            print_notifications(&center);
            report(outcome?)
        }
        Commands::Download {
            document_type,
            layout_json,
        } => {
            let document_type: DocumentType =
                document_type.parse().map_err(DocumentError::InvalidRequest)?;
            let exporter = build_exporter(&config)?;
            let mut page = LoadedPage::load(document_type, exporter.source())?;

            if let Some(path) = layout_json {
                write_layout(&mut page, &config, path)?;
            }

            let mut control = TriggerControl::new(DOWNLOAD_LABEL);
            let mut sink = DirectorySink::new(&config.output_dir);
            let mut center = NotificationCenter::new();

            let outcome = exporter.download(&mut page, &mut control, &mut sink, &mut center);
            print_notifications(&center);
            report(outcome?)
        }
    }
}

fn build_exporter(config: &AppConfig) -> Result<Exporter> {
    let rasterizer = PdfRasterizer::from_options(&config.export)?;
    Ok(Exporter::new(
        Box::new(rasterizer),
        config.templates.build(),
        Box::new(SystemClock),
        config.export.clone(),
    ))
}

/// Write the paginated layout the exporter would render, with the compact
/// override applied.
fn write_layout(page: &mut LoadedPage, config: &AppConfig, path: &Path) -> Result<()> {
    let document_type = page.document_type();
    let rasterizer = PdfRasterizer::from_options(&config.export)?;
    let overrides = PresentationOverride::compact(document_type);

    let guard = overrides.apply(page.document_mut().nodes_mut())?;
    let container = find_by_id(guard.nodes(), document_type.container_id()).ok_or_else(|| {
        DocumentError::TemplateNotFound {
            container_id: document_type.container_id().to_string(),
        }
    })?;
    let layout = rasterizer.layout(container, &config.export)?;
    drop(guard);

    fs::write(path, layout.to_json()?)?;
    eprintln!(
        "Wrote layout '{}' ({} page{}, {} boxes)",
        path.display(),
        layout.pages.len(),
        if layout.pages.len() == 1 { "" } else { "s" },
        layout.box_count()
    );
    Ok(())
}

fn print_notifications(center: &NotificationCenter) {
    for n in center.history() {
        match n.kind {
            NotificationKind::Success => eprintln!("{}", n.message),
            NotificationKind::Error => eprintln!("Error: {}", n.message),
        }
    }
}

fn report(outcome: ExportOutcome) -> Result<bool> {
    if outcome.success {
        println!("{}", outcome.filename);
    }
    Ok(outcome.success)
}
