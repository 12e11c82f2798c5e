use clap::{Parser, Subcommand};
use mdsolo_core::{
    default_registry, CoreConfig, Dispatcher, IntakeFields, LocalBackend, Patient, Services,
    StaticIdentity, SystemClock, TeraRenderer,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mdsolo")]
#[command(about = "MDSolo practice portal CLI")]
struct Cli {
    /// JSON snapshot holding documents, folders and calendar events
    #[arg(long, default_value = "mdsolo-data.json")]
    data_file: PathBuf,
    /// Page templates
    #[arg(long, default_value = "templates")]
    templates: PathBuf,
    /// Master index document id
    #[arg(long, default_value = "master-index")]
    master: String,
    /// Signed-in practitioner; also used as the calendar id
    #[arg(long, default_value = "md@localhost")]
    user: String,
    /// Base URL used in links and redirects
    #[arg(long, default_value = "http://localhost:3000/")]
    base_url: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List indexed patients
    List,
    /// Render a full page to stdout
    Render {
        /// Page name (e.g. Home, PatientDetail)
        page: String,
        /// Page payload as a JSON object
        #[arg(long)]
        data: Option<String>,
        /// Render this view instead of the one the page chooses
        #[arg(long)]
        view: Option<String>,
        /// Print the asynchronous `{status, content}` envelope instead of the full document
        #[arg(long)]
        envelope: bool,
    },
    /// Register a new patient
    CreatePatient {
        name: String,
        gov_id: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Book a visit for a patient
    BookVisit {
        /// Patient document id
        patient_id: String,
        /// Visit date (YYYY-MM-DD)
        date: String,
        /// Visit time (HH:MM)
        time: String,
        /// Price; the practice default when omitted
        #[arg(long)]
        price: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Search patients by name or government id, or by visit notes and diagnoses
    Search {
        #[arg(long)]
        term: Option<String>,
        #[arg(long)]
        keyword: Option<String>,
    },
}

fn dispatcher(cli: &Cli) -> Result<Dispatcher, Box<dyn std::error::Error>> {
    let backend = LocalBackend::open(&cli.data_file)?;
    backend.ensure_document(&cli.master, "Master Index")?;

    let cfg = CoreConfig::new(&cli.base_url, &cli.master, &cli.user, "UTC")?;
    let services = Services::from_backend(
        Arc::new(backend),
        Arc::new(StaticIdentity(cli.user.clone())),
        Arc::new(SystemClock),
    );
    let renderer = TeraRenderer::from_dir(&cli.templates)?;
    Ok(Dispatcher::new(
        Arc::new(cfg),
        services,
        default_registry(),
        Arc::new(renderer),
    ))
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// The validation message an intake form would show for `fields`, if any.
fn intake_rejection(fields: &IntakeFields) -> Option<String> {
    Patient::new_intake(fields).err().map(|e| e.0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mdsolo_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = &cli.command else {
        println!("Use 'mdsolo --help' for commands");
        return Ok(());
    };
    let d = dispatcher(&cli)?;

    match command {
        Commands::List => {
            let entries = d.master_index().entries()?;
            if entries.is_empty() {
                println!("No patients found.");
            }
            for entry in entries {
                let created = entry
                    .created
                    .map(|c| c.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "N/A".into());
                println!(
                    "ID: {}, Name: {}, Gov Id: {}, Created: {}",
                    entry.document_id, entry.name, entry.gov_id, created
                );
            }
        }
        Commands::Render {
            page,
            data,
            view,
            envelope,
        } if *envelope || view.is_some() => {
            let query = match data {
                Some(raw) => match serde_json::from_str::<Value>(raw)? {
                    Value::Object(map) => map,
                    _ => return Err("--data must be a JSON object".into()),
                },
                None => Map::new(),
            };
            let out = d.dispatch_async(Some(page), query, view.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Render { page, data, .. } => {
            let document = d.render_document(Some(page), data.as_deref())?;
            if document.status == 302 {
                println!("Redirect: {}", document.content);
            } else {
                println!("{}", document.content);
            }
        }
        Commands::CreatePatient {
            name,
            gov_id,
            phone,
            email,
        } => {
            let fields = IntakeFields {
                patient_name: name.clone(),
                patient_gov_id: gov_id.clone(),
                patient_phone: phone.clone(),
                patient_email: email.clone(),
            };
            if let Some(message) = intake_rejection(&fields) {
                return Err(message.into());
            }

            let envelope = d.dispatch_async(
                Some("CreateNewPatient"),
                as_object(serde_json::to_value(&fields)?),
                None,
            )?;
            match envelope.status {
                302 => println!("Created patient: {}", envelope.content),
                status => eprintln!("Patient not created (status {status}):\n{}", envelope.content),
            }
        }
        Commands::BookVisit {
            patient_id,
            date,
            time,
            price,
            notes,
        } => {
            let envelope = d.dispatch_async(
                Some("BookNewVisit"),
                as_object(json!({
                    "patientId": patient_id,
                    "visitDate": date,
                    "visitTime": time,
                    "visitPrice": price.clone().unwrap_or_default(),
                    "notes": notes,
                })),
                None,
            )?;
            match envelope.status {
                302 => println!("Booked visit for patient: {}", patient_id),
                status => eprintln!("Visit not booked (status {status}):\n{}", envelope.content),
            }
        }
        Commands::Search { term, keyword } => {
            let matches = d.master_index().search(term.as_deref(), keyword.as_deref())?;
            if matches.is_empty() {
                println!("No matching patients.");
            }
            for m in matches {
                println!(
                    "{} ({}), created {}: {}{}",
                    m.name, m.gov_id, m.date_created, cli.base_url, m.details_link
                );
            }
        }
    }

    Ok(())
}
