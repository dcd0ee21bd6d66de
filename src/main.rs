use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use invoicer::config::{config_dir, load_config, CONFIG_FILE, CONFIG_TEMPLATE};
use invoicer::model::UNKNOWN_CLIENT;
use invoicer::pdf::{generate_pdf, invoice_pdf_path, InvoiceDocument};
use invoicer::{
    available_currencies, Client, ClientDetails, Config, FileStorage, Invoice, InvoiceApp,
    InvoiceError, InvoiceFilter, InvoiceItem, InvoiceStatus, ItemChange, Result,
};

type App = InvoiceApp<FileStorage>;

#[derive(Parser)]
#[command(name = "invoicer")]
#[command(version, about = "Single-user invoicing with local JSON storage", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.invoicer)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and seed empty storage
    Init,

    /// Show company, next invoice number and invoice figures
    Status,

    /// List supported currencies
    Currencies,

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Manage clients
    #[command(subcommand)]
    Client(ClientCommand),

    /// Manage invoices
    #[command(subcommand)]
    Invoice(InvoiceCommand),
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print current settings
    Show,

    /// Change one or more settings
    Set(SettingsArgs),
}

#[derive(Args, Default)]
struct SettingsArgs {
    #[arg(long)]
    company_name: Option<String>,
    #[arg(long)]
    company_email: Option<String>,
    #[arg(long)]
    company_phone: Option<String>,
    #[arg(long)]
    company_address: Option<String>,
    #[arg(long)]
    company_city: Option<String>,
    #[arg(long)]
    company_state: Option<String>,
    #[arg(long)]
    company_zip: Option<String>,
    #[arg(long)]
    company_country: Option<String>,
    #[arg(long)]
    company_website: Option<String>,
    #[arg(long)]
    company_tax_id: Option<String>,
    #[arg(long)]
    company_logo: Option<String>,

    /// Currency code from 'currencies' (e.g., EUR)
    #[arg(long)]
    currency: Option<String>,

    /// Days until an invoice is due
    #[arg(long)]
    payment_terms: Option<u32>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    suffix: Option<String>,

    /// Next invoice sequence number
    #[arg(long)]
    counter: Option<u32>,

    #[arg(long)]
    tax_enabled: Option<bool>,

    /// Tax rate in percent applied to new line items
    #[arg(long)]
    default_tax_rate: Option<f64>,
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Add a client
    Add(ClientArgs),

    /// List clients
    List,

    /// Show one client
    Show {
        /// Client id or index from 'client list'
        client: String,
    },

    /// Change client details
    Edit {
        /// Client id or index from 'client list'
        client: String,

        #[command(flatten)]
        fields: ClientArgs,
    },

    /// Delete a client (invoices referencing it are kept)
    Delete {
        /// Client id or index from 'client list'
        client: String,
    },
}

#[derive(Args, Default)]
struct ClientArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long)]
    country: Option<String>,
}

#[derive(Subcommand)]
enum InvoiceCommand {
    /// Create an invoice; advances the invoice number counter
    New {
        /// Client id or index from 'client list'
        #[arg(short, long)]
        client: String,

        /// Line items as "description:quantity:unit_price[:tax_rate]" (can be repeated)
        #[arg(short, long, value_name = "DESC:QTY:PRICE[:TAX]")]
        item: Vec<String>,

        #[command(flatten)]
        fields: InvoiceFields,

        /// Initial status (default: draft)
        #[arg(long)]
        status: Option<String>,
    },

    /// List invoices, newest first
    List {
        /// Only invoices with this status
        #[arg(long)]
        status: Option<String>,

        /// Only invoices for this client id
        #[arg(long)]
        client: Option<String>,

        /// Invoices dated on or after (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Invoices dated on or before (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Match number, client, title, date ("Mar 5, 2026") or total
        #[arg(short, long)]
        search: Option<String>,

        /// Number of invoices to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show an invoice with its line items
    Show {
        /// Invoice id, number, or index from 'invoice list'
        invoice: String,
    },

    /// Change invoice fields; --item replaces all line items
    Edit {
        /// Invoice id, number, or index from 'invoice list'
        invoice: String,

        /// Move the invoice to another client
        #[arg(long)]
        client: Option<String>,

        #[arg(short, long, value_name = "DESC:QTY:PRICE[:TAX]")]
        item: Vec<String>,

        #[command(flatten)]
        fields: InvoiceFields,
    },

    /// Change or remove a single line item
    Item {
        /// Invoice id, number, or index from 'invoice list'
        invoice: String,

        /// 1-based line number as shown by 'invoice show'
        line: usize,

        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        quantity: Option<f64>,
        #[arg(long)]
        unit_price: Option<f64>,
        #[arg(long)]
        tax_rate: Option<f64>,

        /// Remove the line instead of changing it
        #[arg(long, conflicts_with_all = ["description", "quantity", "unit_price", "tax_rate"])]
        remove: bool,
    },

    /// Set an invoice's status (draft, sent, paid, overdue, canceled)
    Status {
        /// Invoice id, number, or index from 'invoice list'
        invoice: String,

        status: String,
    },

    /// Delete an invoice
    Delete {
        /// Invoice id, number, or index from 'invoice list'
        invoice: String,
    },

    /// Render an invoice to <number>.pdf
    Pdf {
        /// Invoice id, number, or index from 'invoice list'
        invoice: String,

        /// Custom output file path (default: output_dir/<number>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open generated PDF with system default viewer
        #[arg(long)]
        open: bool,
    },
}

#[derive(Args, Default)]
struct InvoiceFields {
    /// Invoice date (YYYY-MM-DD, default: today)
    #[arg(long)]
    date: Option<String>,

    /// Due date (YYYY-MM-DD, default: date + payment terms)
    #[arg(long)]
    due: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    #[arg(long)]
    terms: Option<String>,

    #[arg(long)]
    title: Option<String>,
}

fn main() {
    init_logging();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Currencies => cmd_currencies(),
        Commands::Settings(cmd) => {
            let (_, mut app) = open_app(&cfg_dir)?;
            match cmd {
                SettingsCommand::Show => cmd_settings_show(&app),
                SettingsCommand::Set(args) => cmd_settings_set(&mut app, args),
            }
        }
        Commands::Client(cmd) => {
            let (_, mut app) = open_app(&cfg_dir)?;
            match cmd {
                ClientCommand::Add(args) => cmd_client_add(&mut app, args),
                ClientCommand::List => cmd_client_list(&app),
                ClientCommand::Show { client } => cmd_client_show(&app, &client),
                ClientCommand::Edit { client, fields } => cmd_client_edit(&mut app, &client, fields),
                ClientCommand::Delete { client } => cmd_client_delete(&mut app, &client),
            }
        }
        Commands::Invoice(cmd) => {
            let (config, mut app) = open_app(&cfg_dir)?;
            match cmd {
                InvoiceCommand::New {
                    client,
                    item,
                    fields,
                    status,
                } => cmd_invoice_new(&mut app, &client, &item, fields, status),
                InvoiceCommand::List {
                    status,
                    client,
                    from,
                    to,
                    search,
                    limit,
                } => {
                    let filter = InvoiceFilter {
                        status: status.as_deref().map(str::parse).transpose()?,
                        client_id: client,
                        start_date: from.as_deref().map(|s| parse_date("--from", s)).transpose()?,
                        end_date: to.as_deref().map(|s| parse_date("--to", s)).transpose()?,
                        search,
                    };
                    cmd_invoice_list(&app, &filter, limit)
                }
                InvoiceCommand::Show { invoice } => cmd_invoice_show(&app, &invoice),
                InvoiceCommand::Edit {
                    invoice,
                    client,
                    item,
                    fields,
                } => cmd_invoice_edit(&mut app, &invoice, client, &item, fields),
                InvoiceCommand::Item {
                    invoice,
                    line,
                    description,
                    quantity,
                    unit_price,
                    tax_rate,
                    remove,
                } => {
                    let mut changes = Vec::new();
                    if let Some(d) = description {
                        changes.push(ItemChange::Description(d));
                    }
                    if let Some(q) = quantity {
                        changes.push(ItemChange::Quantity(q));
                    }
                    if let Some(p) = unit_price {
                        changes.push(ItemChange::UnitPrice(p));
                    }
                    if let Some(t) = tax_rate {
                        changes.push(ItemChange::TaxRate(t));
                    }
                    cmd_invoice_item(&mut app, &invoice, line, changes, remove)
                }
                InvoiceCommand::Status { invoice, status } => {
                    cmd_invoice_status(&mut app, &invoice, &status)
                }
                InvoiceCommand::Delete { invoice } => cmd_invoice_delete(&mut app, &invoice),
                InvoiceCommand::Pdf {
                    invoice,
                    output,
                    open,
                } => cmd_invoice_pdf(&app, &config, &cfg_dir, &invoice, output, open),
            }
        }
    }
}

/// Load config and open the store; missing aggregates are seeded here,
/// before any command reads them.
fn open_app(cfg_dir: &Path) -> Result<(Config, App)> {
    let config = load_config(cfg_dir)?;
    let storage = FileStorage::new(config.data_dir(cfg_dir));
    let app = InvoiceApp::open(storage)?;
    Ok((config, app))
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.join(CONFIG_FILE).exists() {
        return Err(InvoiceError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join(CONFIG_FILE), CONFIG_TEMPLATE)?;

    let (config, _) = open_app(cfg_dir)?;

    println!("Initialized invoicer at: {}", cfg_dir.display());
    println!("  Data:   {}", config.data_dir(cfg_dir).display());
    println!("  Output: {}", config.output_dir(cfg_dir).display());
    println!();
    println!("Next steps:");
    println!("  1. Name your company:  invoicer settings set --company-name \"...\"");
    println!("  2. Add a client:       invoicer client add --name \"...\" --email ...");
    println!("  3. Create an invoice:  invoicer invoice new --client 1 --item \"Consulting:8:150\"");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "EMAIL")]
    email: String,
    #[tabled(rename = "CITY")]
    city: String,
}

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "QTY")]
    quantity: String,
    #[tabled(rename = "UNIT PRICE")]
    unit_price: String,
    #[tabled(rename = "TAX")]
    tax_rate: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

#[derive(Tabled)]
struct CurrencyRow {
    #[tabled(rename = "CODE")]
    code: String,
    #[tabled(rename = "SYMBOL")]
    symbol: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "EXAMPLE")]
    example: String,
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| InvoiceError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: "expected YYYY-MM-DD".to_string(),
    })
}

fn parse_number(field: &str, item: &str, value: &str, allow_zero: bool) -> Result<f64> {
    let invalid = |reason: &str| InvoiceError::InvalidValue {
        field: format!("{field} of '{item}'"),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let number: f64 = value.trim().parse().map_err(|_| invalid("must be a number"))?;
    if !number.is_finite() || number < 0.0 || (!allow_zero && number == 0.0) {
        return Err(invalid(if allow_zero {
            "must not be negative"
        } else {
            "must be greater than 0"
        }));
    }
    Ok(number)
}

/// Parse item input like "Consulting:8:150:10" into a line item
fn parse_item_input(input: &str, default_tax_rate: f64) -> Result<InvoiceItem> {
    let parts: Vec<&str> = input.split(':').collect();
    if !(3..=4).contains(&parts.len()) || parts[0].trim().is_empty() {
        return Err(InvoiceError::InvalidItemFormat(input.to_string()));
    }

    let description = parts[0].trim();
    let quantity = parse_number("quantity", description, parts[1], false)?;
    let unit_price = parse_number("unit price", description, parts[2], true)?;
    let tax_rate = match parts.get(3) {
        Some(tax) => parse_number("tax rate", description, tax, true)?,
        None => default_tax_rate,
    };

    Ok(InvoiceItem::new(description, quantity, unit_price, tax_rate))
}

fn parse_items(app: &App, inputs: &[String]) -> Result<Vec<InvoiceItem>> {
    let default_tax_rate = app.settings().item_tax_rate();
    inputs
        .iter()
        .map(|input| parse_item_input(input, default_tax_rate))
        .collect()
}

/// Resolve a client reference: 1-based index from 'client list' or an id.
fn resolve_client<'a>(app: &'a App, reference: &str) -> Result<&'a Client> {
    if let Ok(idx) = reference.parse::<usize>() {
        return idx
            .checked_sub(1)
            .and_then(|i| app.clients().get(i))
            .ok_or_else(|| InvoiceError::ClientNotFound(reference.to_string()));
    }
    app.client(reference)
}

/// Resolve an invoice reference: an invoice number, an id, or a 1-based
/// index from 'invoice list' (newest first). An exact number wins over an
/// index, so with an empty prefix "3" means invoice number 3.
fn resolve_invoice<'a>(app: &'a App, reference: &str) -> Result<&'a Invoice> {
    if let Some(invoice) = app
        .find_invoice_by_number(reference)
        .or_else(|| app.find_invoice(reference))
    {
        return Ok(invoice);
    }

    match reference.parse::<usize>() {
        Ok(idx) if idx == 0 || idx > app.invoices().len() => {
            Err(InvoiceError::InvalidInvoiceIndex(reference.to_string()))
        }
        Ok(idx) => Ok(&app.invoices()[app.invoices().len() - idx]),
        Err(_) => Err(InvoiceError::InvoiceNotFound(reference.to_string())),
    }
}

fn apply_client_args(details: &mut ClientDetails, args: ClientArgs) {
    let fields = [
        (&mut details.name, args.name),
        (&mut details.email, args.email),
        (&mut details.phone, args.phone),
        (&mut details.address, args.address),
        (&mut details.city, args.city),
        (&mut details.state, args.state),
        (&mut details.zip_code, args.zip),
        (&mut details.country, args.country),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            *field = value;
        }
    }
}

fn apply_invoice_fields(invoice: &mut Invoice, fields: InvoiceFields) -> Result<()> {
    if let Some(date) = fields.date {
        invoice.date = parse_date("--date", &date)?;
    }
    if let Some(due) = fields.due {
        invoice.due_date = parse_date("--due", &due)?;
    }
    if let Some(notes) = fields.notes {
        invoice.notes = notes;
    }
    if let Some(terms) = fields.terms {
        invoice.terms = terms;
    }
    if let Some(title) = fields.title {
        invoice.title = (!title.is_empty()).then_some(title);
    }
    Ok(())
}

/// Show company, numbering and dashboard figures
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    let (_, app) = open_app(cfg_dir)?;
    let settings = app.settings();
    let stats = app.dashboard();

    println!("Invoice Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Data directory:   {}", app.storage().dir().display());
    println!(
        "Company:          {}",
        if settings.company.name.is_empty() {
            "(not set)"
        } else {
            settings.company.name.as_str()
        }
    );
    println!("Currency:         {}", settings.currency.code);
    println!("Clients:          {}", stats.client_count);
    println!("Invoices:         {}", stats.invoice_count);
    println!("Next invoice:     {}", app.generate_invoice_number());
    println!();
    println!(
        "Paid:     {:>3}  {:>14}  ({:.0}%)",
        stats.paid_count,
        app.format_currency(stats.total_paid),
        stats.paid_percentage
    );
    println!(
        "Pending:  {:>3}  {:>14}",
        stats.pending_count,
        app.format_currency(stats.total_pending)
    );
    println!(
        "Overdue:  {:>3}  {:>14}  ({:.0}%)",
        stats.overdue_count,
        app.format_currency(stats.total_overdue),
        stats.overdue_percentage
    );

    let recent = app.recent_invoices(5);
    if !recent.is_empty() {
        println!();
        println!("Recent invoices:");
        for invoice in recent {
            println!(
                "  {} - {} - {} - {}",
                invoice.number,
                app.client_name(invoice),
                app.format_currency(invoice.total),
                invoice.status
            );
        }
    }

    Ok(())
}

/// List supported currencies
fn cmd_currencies() -> Result<()> {
    let rows: Vec<CurrencyRow> = available_currencies()
        .into_iter()
        .map(|c| CurrencyRow {
            example: c.format(1234.5),
            code: c.code,
            symbol: c.symbol,
            name: c.name,
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_settings_show(app: &App) -> Result<()> {
    let s = app.settings();
    let c = &s.company;

    println!("Company");
    println!("  Name:     {}", c.name);
    println!("  Email:    {}", c.email);
    println!("  Phone:    {}", c.phone);
    println!("  Address:  {}, {} {} {}", c.address, c.city, c.state, c.zip_code);
    println!("  Country:  {}", c.country);
    println!("  Website:  {}", c.website);
    println!("  Tax ID:   {}", c.tax_id);
    println!();
    println!("Currency:         {} ({})", s.currency.code, s.currency.name);
    println!("Payment terms:    {} days", s.payment_terms);
    println!("Number prefix:    {:?}", s.invoice_number_prefix);
    println!("Number suffix:    {:?}", s.invoice_number_suffix);
    println!("Next number:      {}", app.generate_invoice_number());
    println!("Tax enabled:      {}", s.tax_enabled);
    println!("Default tax rate: {}%", s.default_tax_rate);

    Ok(())
}

fn cmd_settings_set(app: &mut App, args: SettingsArgs) -> Result<()> {
    let mut settings = app.settings().clone();

    if let Some(code) = args.currency {
        settings.currency = invoicer::currency::find_currency(&code)
            .ok_or(InvoiceError::UnknownCurrency(code))?;
    }

    let company = &mut settings.company;
    let fields = [
        (&mut company.name, args.company_name),
        (&mut company.email, args.company_email),
        (&mut company.phone, args.company_phone),
        (&mut company.address, args.company_address),
        (&mut company.city, args.company_city),
        (&mut company.state, args.company_state),
        (&mut company.zip_code, args.company_zip),
        (&mut company.country, args.company_country),
        (&mut company.website, args.company_website),
        (&mut company.tax_id, args.company_tax_id),
        (&mut company.logo, args.company_logo),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            *field = value;
        }
    }

    if let Some(days) = args.payment_terms {
        settings.payment_terms = days;
    }
    if let Some(prefix) = args.prefix {
        settings.invoice_number_prefix = prefix;
    }
    if let Some(suffix) = args.suffix {
        settings.invoice_number_suffix = suffix;
    }
    if let Some(counter) = args.counter {
        if counter == 0 {
            return Err(InvoiceError::InvalidValue {
                field: "--counter".to_string(),
                value: counter.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        settings.invoice_number_counter = counter;
    }
    if let Some(enabled) = args.tax_enabled {
        settings.tax_enabled = enabled;
    }
    if let Some(rate) = args.default_tax_rate {
        if !rate.is_finite() || rate < 0.0 {
            return Err(InvoiceError::InvalidValue {
                field: "--default-tax-rate".to_string(),
                value: rate.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        settings.default_tax_rate = rate;
    }

    app.update_settings(settings)?;
    println!("Settings saved. Next invoice: {}", app.generate_invoice_number());
    Ok(())
}

fn cmd_client_add(app: &mut App, args: ClientArgs) -> Result<()> {
    let name = args.name.clone().unwrap_or_default();
    if name.trim().is_empty() {
        return Err(InvoiceError::InvalidValue {
            field: "--name".to_string(),
            value: name,
            reason: "a client needs a name".to_string(),
        });
    }

    let mut details = ClientDetails::default();
    apply_client_args(&mut details, args);
    let client = app.add_client(details)?;

    println!("Added client {}", client.name());
    println!("  ID: {}", client.id);
    Ok(())
}

/// List configured clients
fn cmd_client_list(app: &App) -> Result<()> {
    if app.clients().is_empty() {
        println!("No clients yet.");
        println!("Add one with: invoicer client add --name <name>");
        return Ok(());
    }

    let rows: Vec<ClientRow> = app
        .clients()
        .iter()
        .enumerate()
        .map(|(idx, client)| ClientRow {
            index: idx + 1,
            id: client.id.clone(),
            name: client.details.name.clone(),
            email: client.details.email.clone(),
            city: client.details.city.clone(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

fn cmd_client_show(app: &App, reference: &str) -> Result<()> {
    let client = resolve_client(app, reference)?;
    let d = &client.details;

    println!("{}", d.name);
    println!("  ID:       {}", client.id);
    println!("  Email:    {}", d.email);
    println!("  Phone:    {}", d.phone);
    println!("  Address:  {}, {} {} {}", d.address, d.city, d.state, d.zip_code);
    println!("  Country:  {}", d.country);

    let filter = InvoiceFilter {
        client_id: Some(client.id.clone()),
        ..InvoiceFilter::default()
    };
    let invoices = app.filter_invoices(&filter);
    let billed: f64 = invoices.iter().map(|i| i.total).sum();
    println!(
        "  Invoices: {} ({} billed)",
        invoices.len(),
        app.format_currency(billed)
    );
    Ok(())
}

fn cmd_client_edit(app: &mut App, reference: &str, args: ClientArgs) -> Result<()> {
    let mut client = resolve_client(app, reference)?.clone();
    apply_client_args(&mut client.details, args);
    let name = client.details.name.clone();
    app.update_client(client)?;

    println!("Updated client {name}");
    Ok(())
}

fn cmd_client_delete(app: &mut App, reference: &str) -> Result<()> {
    let client = match resolve_client(app, reference) {
        Ok(client) => client.clone(),
        Err(InvoiceError::ClientNotFound(_)) => {
            println!("No client '{reference}'; nothing deleted.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    app.delete_client(&client.id)?;
    println!("Deleted client {}", client.name());

    let kept = app
        .invoices()
        .iter()
        .filter(|i| i.client_id == client.id)
        .count();
    if kept > 0 {
        println!("  {kept} invoice(s) kept; they now show the client as {UNKNOWN_CLIENT}");
    }
    Ok(())
}

fn cmd_invoice_new(
    app: &mut App,
    client_ref: &str,
    item_inputs: &[String],
    fields: InvoiceFields,
    status: Option<String>,
) -> Result<()> {
    let client = resolve_client(app, client_ref)?.clone();
    let items = parse_items(app, item_inputs)?;

    let date = match fields.date.as_deref() {
        Some(s) => parse_date("--date", s)?,
        None => Local::now().date_naive(),
    };

    let mut draft = app.new_invoice(client.id.clone(), date);
    for item in items {
        draft.add_item(item);
    }
    if let Some(due) = fields.due.as_deref() {
        draft.due_date = parse_date("--due", due)?;
    }
    if let Some(notes) = fields.notes {
        draft.notes = notes;
    }
    if let Some(terms) = fields.terms {
        draft.terms = terms;
    }
    draft.title = fields.title.filter(|t| !t.is_empty());
    if let Some(status) = status {
        draft.status = status.parse()?;
    }

    let invoice = app.add_invoice(draft)?;

    println!("Created {}", invoice.number);
    println!("  Client: {}", client.name());
    println!("  Due:    {}", invoice.due_date);
    println!("  Total:  {}", app.format_currency(invoice.total));
    println!("  ID:     {}", invoice.id);
    Ok(())
}

/// List invoices, newest first, with the status breakdown
fn cmd_invoice_list(app: &App, filter: &InvoiceFilter, limit: Option<usize>) -> Result<()> {
    if app.invoices().is_empty() {
        println!("No invoices yet.");
        return Ok(());
    }

    let total = app.invoices().len();
    let matching = app.filter_invoices(filter);
    if matching.is_empty() {
        println!("No invoices match the given filters.");
        return Ok(());
    }

    // Index refers to the full list so it stays valid for other commands.
    let position = |invoice: &Invoice| {
        app.invoices()
            .iter()
            .position(|i| i.id == invoice.id)
            .map_or(0, |p| total - p)
    };

    let shown = matching.len().min(limit.unwrap_or(usize::MAX));
    let rows: Vec<InvoiceRow> = matching
        .iter()
        .rev()
        .take(shown)
        .map(|&invoice| InvoiceRow {
            index: position(invoice),
            number: invoice.number.clone(),
            date: invoice.date.to_string(),
            due: invoice.due_date.to_string(),
            client: app.client_name(invoice).to_string(),
            total: app.format_currency(invoice.total),
            status: invoice.status.as_str().to_uppercase(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    let shown_total: f64 = matching.iter().rev().take(shown).map(|i| i.total).sum();
    println!();
    println!(
        "Showing {} of {} invoices, totalling {}",
        shown,
        total,
        app.format_currency(shown_total)
    );

    let counts = app.status_counts();
    let breakdown: Vec<String> = InvoiceStatus::ALL
        .iter()
        .map(|s| format!("{} {}", s, counts.get(*s)))
        .collect();
    println!("By status: {}", breakdown.join(", "));

    Ok(())
}

fn cmd_invoice_show(app: &App, reference: &str) -> Result<()> {
    let invoice = resolve_invoice(app, reference)?;
    let settings = app.settings();

    println!(
        "{} {}",
        invoice.title.as_deref().unwrap_or("Invoice"),
        invoice.number
    );
    println!("  Status:  {}", invoice.status);
    println!("  Client:  {}", app.client_name(invoice));
    println!("  Date:    {}", invoice.date);
    println!("  Due:     {}", invoice.due_date);
    println!("  ID:      {}", invoice.id);

    if invoice.items.is_empty() {
        println!();
        println!("No line items.");
    } else {
        let rows: Vec<ItemRow> = invoice
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| ItemRow {
                index: idx + 1,
                description: item.description.clone(),
                quantity: item.quantity.to_string(),
                unit_price: app.format_currency(item.unit_price),
                tax_rate: format!("{}%", item.tax_rate),
                amount: app.format_currency(item.total),
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    println!("  Subtotal: {}", app.format_currency(invoice.subtotal));
    if settings.tax_enabled {
        println!("  Tax:      {}", app.format_currency(invoice.tax_total));
    }
    println!("  Total:    {}", app.format_currency(invoice.total));

    if !invoice.terms.is_empty() {
        println!();
        println!("{}", invoice.terms);
    }
    if !invoice.notes.is_empty() {
        println!("{}", invoice.notes);
    }
    Ok(())
}

fn cmd_invoice_edit(
    app: &mut App,
    reference: &str,
    client_ref: Option<String>,
    item_inputs: &[String],
    fields: InvoiceFields,
) -> Result<()> {
    let mut invoice = resolve_invoice(app, reference)?.clone();

    if let Some(client_ref) = client_ref {
        invoice.client_id = resolve_client(app, &client_ref)?.id.clone();
    }
    if !item_inputs.is_empty() {
        invoice.items = parse_items(app, item_inputs)?;
    }
    apply_invoice_fields(&mut invoice, fields)?;

    let saved = app.update_invoice(invoice)?;
    println!("Updated {}", saved.number);
    println!("  Total: {}", app.format_currency(saved.total));
    Ok(())
}

fn cmd_invoice_item(
    app: &mut App,
    reference: &str,
    line: usize,
    changes: Vec<ItemChange>,
    remove: bool,
) -> Result<()> {
    let mut invoice = resolve_invoice(app, reference)?.clone();
    let tax_enabled = app.settings().tax_enabled;

    let item_id = line
        .checked_sub(1)
        .and_then(|i| invoice.items.get(i))
        .map(|item| item.id.clone())
        .ok_or_else(|| InvoiceError::ItemNotFound(format!("line {line}")))?;

    if remove {
        invoice.remove_item(&item_id, tax_enabled);
    } else {
        for change in changes {
            invoice.update_item(&item_id, change, tax_enabled)?;
        }
    }

    let saved = app.update_invoice(invoice)?;
    println!("Updated {} line {}", saved.number, line);
    println!("  Subtotal: {}", app.format_currency(saved.subtotal));
    println!("  Total:    {}", app.format_currency(saved.total));
    Ok(())
}

fn cmd_invoice_status(app: &mut App, reference: &str, status: &str) -> Result<()> {
    let status: InvoiceStatus = status.parse()?;
    let id = resolve_invoice(app, reference)?.id.clone();
    let invoice = app.set_invoice_status(&id, status)?;

    println!("Marked {} as {}", invoice.number, invoice.status);
    Ok(())
}

fn cmd_invoice_delete(app: &mut App, reference: &str) -> Result<()> {
    let invoice = resolve_invoice(app, reference)?.clone();
    app.delete_invoice(&invoice.id)?;
    println!("Deleted {}", invoice.number);
    Ok(())
}

fn cmd_invoice_pdf(
    app: &App,
    config: &Config,
    cfg_dir: &Path,
    reference: &str,
    output: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let invoice = resolve_invoice(app, reference)?;
    let client = app.find_client(&invoice.client_id);
    let document = InvoiceDocument::build(invoice, client, app.settings());

    let pdf_path =
        output.unwrap_or_else(|| invoice_pdf_path(&config.output_dir(cfg_dir), &document));
    generate_pdf(&document, &pdf_path)?;

    println!("Rendered {}", invoice.number);
    println!("  Saved: {}", pdf_path.display());

    if open {
        open_path(&pdf_path)?;
    }
    Ok(())
}

fn open_path(pdf_path: &Path) -> Result<()> {
    // Open with system default viewer
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(pdf_path).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(pdf_path)
            .spawn()?;
    }
    Ok(())
}
