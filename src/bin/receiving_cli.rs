//! Operator CLI for the check step of partial receiving.
//!
//! Drives the library end to end against a receiving backend (the real one
//! or `receiving-mock-server`): inspect a shipment, cancel remainders, save
//! progress, and finalize. The last reconciled state is kept in a session
//! file so `show` works without re-fetching.

use std::fs;
use std::io::{self, BufRead, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;

use receiving_client::client::ReceivingApiClient;
use receiving_client::config::{self, ClientConfig};
use receiving_client::controller::{
    CheckStepController, Navigator, ProgressIndicator, SubmitOutcome,
};
use receiving_client::messages::{self, MessageCatalog};
use receiving_client::mock;
use receiving_client::models::{LocationCapabilities, PartialReceipt, ReceiptStatus};
use receiving_client::schema;
use receiving_client::state::{self, ReceivingFormState};
use receiving_client::validation;
use receiving_client::wire;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize(&cli)?;

    match cli.command {
        Commands::Sample(args) => handle_sample(&context, args)?,
        Commands::Show(args) => handle_show(&context, args)?,
        Commands::CancelRemaining(args) => handle_cancel_remaining(&context, args)?,
        Commands::Save(args) => handle_save(&context, args).await?,
        Commands::Receive(args) => handle_receive(&context, args).await?,
        Commands::Back(args) => handle_back(&context, args).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "receiving",
    about = "Check-step CLI for the partial receiving workflow",
    version
)]
struct Cli {
    #[arg(long, global = true, help = "Receiving API base URL (overrides config)")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Request timeout in seconds (overrides config)")]
    timeout: Option<u64>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Answer yes to the receive confirmation prompt"
    )]
    yes: bool,
    #[arg(long, global = true, help = "JSON file of message-id overrides")]
    lang_file: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Treat the location as having no bin locations"
    )]
    no_bin_locations: bool,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Treat the location as not supporting partial receiving"
    )]
    no_partial_receiving: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a representative check-step form to a file
    Sample(SampleArgs),
    /// Validate and render the check screen for a form file
    Show(ShowArgs),
    /// Flag every outstanding remainder for cancellation, locally
    CancelRemaining(CancelRemainingArgs),
    /// Persist the form and keep the server's reconciled copy
    Save(ShipmentArgs),
    /// Finalize the receipt, confirming missing bin locations if asked
    Receive(ShipmentArgs),
    /// Persist the form and hand the values back to the edit step
    Back(BackArgs),
}

#[derive(Args)]
struct SampleArgs {
    #[arg(long, default_value = "receiving-sample.json", help = "Output file")]
    out: PathBuf,
}

#[derive(Args)]
struct ShowArgs {
    #[arg(long, help = "Form file to render; defaults to the saved session")]
    values: Option<PathBuf>,
}

#[derive(Args)]
struct CancelRemainingArgs {
    #[arg(long, help = "Form file to update")]
    values: PathBuf,
    #[arg(long, help = "Output file; defaults to updating in place")]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ShipmentArgs {
    #[arg(long, help = "Shipment id the form belongs to")]
    shipment_id: String,
    #[arg(long, help = "Form file to send")]
    values: PathBuf,
}

#[derive(Args)]
struct BackArgs {
    #[arg(long, help = "Shipment id the form belongs to")]
    shipment_id: String,
    #[arg(long, help = "Form file to send")]
    values: PathBuf,
    #[arg(
        long,
        default_value = "receiving-step1.json",
        help = "Where to write the values handed back to the edit step"
    )]
    out: PathBuf,
}

struct CliContext {
    config: ClientConfig,
    catalog: Arc<MessageCatalog>,
    capabilities: LocationCapabilities,
    json: bool,
    yes: bool,
}

impl CliContext {
    fn initialize(cli: &Cli) -> Result<Self> {
        let mut config = config::load_config().context("failed to load configuration")?;
        if let Some(base_url) = &cli.base_url {
            config.api_base_url = base_url.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.request_timeout_secs = timeout;
        }
        config::init_tracing(&config);

        let catalog = match &cli.lang_file {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                MessageCatalog::from_json_str(&raw).context("invalid language file")?
            }
            None => MessageCatalog::new(),
        };

        let mut capabilities = config.capabilities();
        if cli.no_bin_locations {
            capabilities.bin_location_support = false;
        }
        if cli.no_partial_receiving {
            capabilities.partial_receiving_support = false;
        }

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            capabilities,
            json: cli.json,
            yes: cli.yes,
        })
    }

    fn api_client(&self) -> Result<ReceivingApiClient> {
        ReceivingApiClient::new(self.config.api_base_url.clone(), self.config.request_timeout())
            .map_err(|e| anyhow!("failed to build HTTP client: {e}"))
    }

    fn controller(
        &self,
        shipment_id: &str,
        values: PartialReceipt,
        back_out: Option<PathBuf>,
    ) -> Result<(Arc<CheckStepController>, Arc<CliNavigator>)> {
        let completed = values.receipt_status == Some(ReceiptStatus::Completed);
        let navigator = Arc::new(CliNavigator::new(back_out));
        let controller = CheckStepController::new(
            self.api_client()?,
            shipment_id,
            ReceivingFormState::new(values, completed),
            self.capabilities,
            self.catalog.clone(),
            Arc::new(CliProgress),
            navigator.clone(),
        );
        Ok((Arc::new(controller), navigator))
    }

    fn session_path(&self) -> &Path {
        Path::new(&self.config.session_file)
    }

    fn save_session(&self, values: &PartialReceipt) -> Result<()> {
        let payload = serde_json::to_vec_pretty(values)?;
        fs::write(self.session_path(), payload)
            .with_context(|| format!("failed to write {}", self.session_path().display()))?;
        Ok(())
    }
}

/// Spinner stand-in for a terminal: one line when the request starts, one
/// when it settles.
struct CliProgress;

impl ProgressIndicator for CliProgress {
    fn show(&self) {
        eprintln!("Saving...");
    }
    fn hide(&self) {
        eprintln!("Done.");
    }
}

/// Navigation for a terminal: completion prints the summary route, going
/// back writes the values where the edit step would pick them up.
struct CliNavigator {
    back_out: Option<PathBuf>,
    summary: Mutex<Option<String>>,
}

impl CliNavigator {
    fn new(back_out: Option<PathBuf>) -> Self {
        Self {
            back_out,
            summary: Mutex::new(None),
        }
    }

    fn summary_reference(&self) -> Option<String> {
        self.summary.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Navigator for CliNavigator {
    fn open_summary(&self, reference: &str) {
        if let Ok(mut slot) = self.summary.lock() {
            *slot = Some(reference.to_string());
        }
    }

    fn return_to_previous_step(&self, values: PartialReceipt) {
        let Some(path) = &self.back_out else {
            return;
        };
        match serde_json::to_vec_pretty(&values) {
            Ok(payload) => {
                if let Err(error) = fs::write(path, payload) {
                    eprintln!("Failed to write {}: {error}", path.display());
                }
            }
            Err(error) => eprintln!("Failed to serialize step 1 values: {error}"),
        }
    }
}

/// Reads a form file. Both the nested shape and the flattened wire shape are
/// accepted, so captured request bodies can be replayed directly.
fn load_receipt(path: &Path) -> Result<PartialReceipt> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let tree: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let receipt = serde_json::from_value(wire::expand(&tree))
        .with_context(|| format!("{} is not a check-step form", path.display()))?;
    Ok(receipt)
}

fn write_receipt(path: &Path, values: &PartialReceipt) -> Result<()> {
    let payload = serde_json::to_vec_pretty(values)?;
    fs::write(path, payload).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_sample(context: &CliContext, args: SampleArgs) -> Result<()> {
    let sample = mock::demo_receipt();
    write_receipt(&args.out, &sample)?;
    if context.json {
        print_json(&sample)?;
    } else {
        println!("Sample check-step form written to {}", args.out.display());
    }
    Ok(())
}

fn handle_show(context: &CliContext, args: ShowArgs) -> Result<()> {
    let path = args
        .values
        .unwrap_or_else(|| context.session_path().to_path_buf());
    if !path.exists() {
        return Err(anyhow!(
            "{} does not exist; run `save` first or pass --values",
            path.display()
        ));
    }
    let values = load_receipt(&path)?;
    render_receipt(context, &values)
}

fn render_receipt(context: &CliContext, values: &PartialReceipt) -> Result<()> {
    let errors = validation::validate(values);
    let completed = values.receipt_status == Some(ReceiptStatus::Completed);
    let locked = completed || values.containers.is_empty();

    let header = schema::resolve_header_fields(
        values,
        &errors,
        &context.catalog,
        locked,
        context.capabilities,
    );
    let rows =
        schema::resolve_table(values, &errors, &context.catalog, locked, context.capabilities);

    if context.json {
        return print_json(&serde_json::json!({
            "completed": completed,
            "header": header,
            "rows": rows,
            "errors": errors,
        }));
    }

    if completed {
        println!("== RECEIVED == (all controls disabled)");
    }
    for field in &header {
        let mut line = format!("{}: {}", field.label, field.value);
        if let Some(error) = &field.error {
            line.push_str(&format!("  [!] {error}"));
        }
        println!("{line}");
    }
    println!();

    for row in &rows {
        match row.item_index {
            None => {
                let labels: Vec<String> = row
                    .cells
                    .iter()
                    .filter(|cell| !cell.value.is_empty())
                    .map(|cell| cell.value.clone())
                    .collect();
                println!("[{}]", labels.join(" / "));
            }
            Some(_) => {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .filter(|cell| cell.checked.is_some() || !cell.value.is_empty())
                    .map(|cell| {
                        let mut text = match cell.checked {
                            Some(checked) => {
                                format!("{} {}", if checked { "[x]" } else { "[ ]" }, cell.label)
                            }
                            None => format!("{}: {}", cell.label, cell.value),
                        };
                        if cell.attrs.emphasis == schema::Emphasis::StrikeThrough {
                            text.push_str(" (settled)");
                        }
                        if let Some(error) = &cell.error {
                            text.push_str(&format!("  [!] {error}"));
                        }
                        text
                    })
                    .collect();
                println!("  - {}", cells.join(" | "));
            }
        }
    }

    if !errors.is_empty() {
        println!();
        println!(
            "{}",
            context.catalog.resolve(messages::ERROR_VALIDATION)
        );
    }
    Ok(())
}

fn handle_cancel_remaining(context: &CliContext, args: CancelRemainingArgs) -> Result<()> {
    if !context.capabilities.partial_receiving_support {
        return Err(anyhow!(
            "partial receiving is not supported at this location"
        ));
    }
    let values = load_receipt(&args.values)?;
    let updated = state::cancel_all_remaining(&values);
    let out = args.out.unwrap_or(args.values);
    write_receipt(&out, &updated)?;

    if context.json {
        print_json(&updated)?;
    } else {
        let flagged = updated
            .containers
            .iter()
            .flat_map(|c| &c.shipment_items)
            .filter(|item| item.cancel_remaining)
            .count();
        println!(
            "Flagged {flagged} of {} lines; written to {}",
            updated.item_count(),
            out.display()
        );
    }
    Ok(())
}

async fn handle_save(context: &CliContext, args: ShipmentArgs) -> Result<()> {
    let values = load_receipt(&args.values)?;
    let (controller, _) = context.controller(&args.shipment_id, values, None)?;

    controller
        .save()
        .await
        .map_err(|e| anyhow!(e.user_message(&context.catalog)))?;

    let reconciled = controller.values().await;
    context.save_session(&reconciled)?;
    if context.json {
        print_json(&reconciled)?;
    } else {
        println!(
            "Saved shipment {}; session stored at {}",
            args.shipment_id,
            context.session_path().display()
        );
    }
    Ok(())
}

async fn handle_receive(context: &CliContext, args: ShipmentArgs) -> Result<()> {
    let values = load_receipt(&args.values)?;
    let (controller, navigator) = context.controller(&args.shipment_id, values.clone(), None)?;

    let outcome = controller
        .submit(values)
        .await
        .map_err(|e| anyhow!(e.user_message(&context.catalog)))?;

    if let SubmitOutcome::ConfirmationRequired { title, message } = outcome {
        println!("{title}: {message}");
        if !(context.yes || prompt_yes(&context.catalog)?) {
            controller
                .decline_pending()
                .await
                .map_err(|e| anyhow!(e.to_string()))?;
            println!("Not received; the form is unchanged.");
            return Ok(());
        }
        controller
            .confirm_pending()
            .await
            .map_err(|e| anyhow!(e.user_message(&context.catalog)))?;
    }

    let reconciled = controller.values().await;
    context.save_session(&reconciled)?;
    if context.json {
        print_json(&reconciled)?;
    } else {
        println!("Shipment {} received.", args.shipment_id);
        if let Some(reference) = navigator.summary_reference() {
            println!("Summary: /shipment/{reference}");
        }
    }
    Ok(())
}

async fn handle_back(context: &CliContext, args: BackArgs) -> Result<()> {
    let values = load_receipt(&args.values)?;
    let (controller, _) =
        context.controller(&args.shipment_id, values.clone(), Some(args.out.clone()))?;

    controller
        .back(values)
        .await
        .map_err(|e| anyhow!(e.user_message(&context.catalog)))?;

    if !context.json {
        println!(
            "Saved; step 1 values written to {}",
            args.out.display()
        );
    }
    Ok(())
}

fn prompt_yes(catalog: &MessageCatalog) -> Result<bool> {
    print!(
        "{} / {}? [y/N] ",
        catalog.resolve(messages::BUTTON_YES),
        catalog.resolve(messages::BUTTON_NO)
    );
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
