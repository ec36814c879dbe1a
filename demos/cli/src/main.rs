use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use labreport_core::{
    build_report_view, demographics, Catalog, Classifier, DashboardStats, NewLab, NewPatient,
    NewTestRecord, ReportConfig, ReportView,
};
use labreport_store::{
    decode_report_payload, load_dashboard, spawn_refresh, DataStore, HttpDataStore, LoadOutcome,
    ReportAssembler, ReportLoader, ReportSource, Session, SessionContext, StoreConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "labreport",
    about = "Interpret lab results and print patient reports."
)]
struct Args {
    /// Data store base URL (overrides LABREPORT_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds (overrides LABREPORT_TIMEOUT_SECS).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Also classify "Up to N" reference ranges.
    #[arg(long, global = true)]
    recognize_up_to: bool,

    /// Where the sign-in session is kept.
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify one value against a reference range.
    Classify {
        #[arg(long)]
        value: String,
        #[arg(long)]
        range: String,
    },
    /// Show the built-in test catalog.
    Catalog {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Render a saved report payload file.
    Render {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    SignIn {
        #[arg(long)]
        email: String,
    },
    SignOut,
    #[command(flatten)]
    Remote(RemoteCommand),
}

/// Commands that talk to the data store.
#[derive(Subcommand, Debug)]
enum RemoteCommand {
    /// Fetch and render one patient's report.
    Report {
        #[arg(long)]
        patient_id: i64,
        /// Use the store's consolidated report endpoint.
        #[arg(long)]
        consolidated: bool,
        #[arg(long)]
        json: bool,
    },
    List {
        #[arg(value_enum)]
        what: ListTarget,
    },
    AddPatient {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        gender: String,
        #[arg(long)]
        contact: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        address: String,
    },
    /// Record a result. Unit and range come from the catalog unless given.
    AddTest {
        #[arg(long)]
        patient_id: i64,
        #[arg(long)]
        category: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: String,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        range: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    AddLab {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slogan: Option<String>,
        #[arg(long)]
        address: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: String,
    },
    DeleteTest {
        #[arg(long)]
        id: i64,
    },
    /// Headline counters; `--watch` keeps refreshing until Ctrl-C.
    Dashboard {
        #[arg(long)]
        watch: bool,
    },
    /// Gender and age-group breakdown of registered patients.
    Demographics,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ListTarget {
    Patients,
    Tests,
    Labs,
}

fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "labreport=debug,labreport_store=debug"
    } else {
        "labreport=info,labreport_store=info"
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(default_log_filter(true))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_filter(false)))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let report_config = ReportConfig {
        recognize_up_to: args.recognize_up_to,
        ..ReportConfig::default()
    };
    let classifier = Classifier::from_config(&report_config);

    match args.command {
        Command::Classify { ref value, ref range } => {
            println!("{}", classifier.classify(value, range));
        }
        Command::Catalog { ref category, json } => print_catalog(category.as_deref(), json)?,
        Command::Render { ref input, json } => {
            let body = std::fs::read_to_string(input)
                .with_context(|| format!("could not read {}", input.display()))?;
            let report = decode_report_payload(&body)
                .with_context(|| format!("{} is not a report payload", input.display()))?
                .into_report(None, &report_config.placeholder);
            emit_view(&build_report_view(&report, &classifier), json)?;
        }
        Command::SignIn { ref email } => {
            let mut session = open_session(&args)?;
            let signed_in = session.sign_in(email)?;
            println!("Signed in as {}", signed_in.email);
        }
        Command::SignOut => {
            open_session(&args)?.sign_out()?;
            println!("Signed out");
        }
        Command::Remote(ref command) => {
            let store_config = store_config(&args)?;
            let store = Arc::new(HttpDataStore::new(&store_config)?);
            tracing::debug!(base_url = store.base_url(), "using data store");
            run_remote(command, &args, store, &store_config, report_config, classifier).await?;
        }
    }

    Ok(())
}

async fn run_remote(
    command: &RemoteCommand,
    args: &Args,
    store: Arc<HttpDataStore>,
    store_config: &StoreConfig,
    report_config: ReportConfig,
    classifier: Classifier,
) -> anyhow::Result<()> {
    match command {
        RemoteCommand::Report {
            patient_id,
            consolidated,
            json,
        } => {
            let source = if *consolidated {
                ReportSource::Consolidated
            } else {
                ReportSource::Joined
            };
            let loader =
                ReportLoader::new(ReportAssembler::new(store, report_config)).with_source(source);
            match loader.load(*patient_id).await {
                LoadOutcome::Loaded => {}
                LoadOutcome::Failed(err) => {
                    return Err(err)
                        .with_context(|| format!("loading report for patient {patient_id}"));
                }
                LoadOutcome::Superseded => bail!("report request was superseded"),
            }
            let view = loader
                .snapshot()
                .view
                .context("report loaded but no view was produced")?;
            emit_view(&view, *json)?;
        }
        RemoteCommand::List { what } => list(store.as_ref(), *what, &classifier).await?,
        RemoteCommand::AddPatient {
            full_name,
            age,
            gender,
            contact,
            email,
            code,
            address,
        } => {
            require_session(args)?;
            store
                .create_patient(&NewPatient {
                    full_name: full_name.clone(),
                    age: *age,
                    gender: gender.clone(),
                    contact_number: contact.clone(),
                    email: email.clone(),
                    patient_code: code.clone(),
                    address: address.clone(),
                })
                .await?;
            println!("Patient {code} registered");
        }
        RemoteCommand::AddTest {
            patient_id,
            category,
            name,
            value,
            unit,
            range,
            note,
        } => {
            require_session(args)?;
            let mut record = match Catalog::builtin().find_definition(category, name) {
                Some(definition) => {
                    NewTestRecord::prefilled(*patient_id, definition, value.clone())
                }
                None => NewTestRecord {
                    patient_id: *patient_id,
                    test_category: category.clone(),
                    test_name: name.clone(),
                    test_value: value.clone(),
                    normal_range: String::new(),
                    unit: String::new(),
                    additional_note: None,
                },
            };
            if let Some(unit) = unit {
                record.unit = unit.clone();
            }
            if let Some(range) = range {
                record.normal_range = range.clone();
            }
            record.additional_note = note.clone();

            store.create_test(&record).await?;
            println!(
                "{} = {} recorded ({})",
                record.test_name,
                record.test_value,
                classifier.classify(&record.test_value, &record.normal_range)
            );
        }
        RemoteCommand::AddLab {
            name,
            slogan,
            address,
            phone,
            email,
        } => {
            require_session(args)?;
            store
                .create_lab(&NewLab {
                    name: name.clone(),
                    slogan: slogan.clone(),
                    address: address.clone(),
                    phone: phone.clone(),
                    email: email.clone(),
                })
                .await?;
            println!("Lab {name} added");
        }
        RemoteCommand::DeleteTest { id } => {
            require_session(args)?;
            store.delete_test(*id).await?;
            println!("Test {id} deleted");
        }
        RemoteCommand::Dashboard { watch: false } => {
            let stats = load_dashboard(store.as_ref(), &classifier, Utc::now().date_naive()).await?;
            print_stats(&stats);
        }
        RemoteCommand::Dashboard { watch: true } => {
            let classifier = Arc::new(classifier);
            let handle = spawn_refresh(store_config.refresh_interval(), move || {
                let store = Arc::clone(&store);
                let classifier = Arc::clone(&classifier);
                async move {
                    let today = Utc::now().date_naive();
                    match load_dashboard(store.as_ref(), &classifier, today).await {
                        Ok(stats) => print_stats(&stats),
                        Err(err) => eprintln!("{}", err.user_message()),
                    }
                }
            });
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            handle.stop();
        }
        RemoteCommand::Demographics => {
            let patients = store.list_patients().await?;
            let stats = demographics(&patients);
            let gender = stats.gender;
            println!("Gender");
            for (label, count) in [
                ("Male", gender.male),
                ("Female", gender.female),
                ("Other", gender.other),
            ] {
                println!("  {label:<12} {count:>4}  {:>3}%", stats.gender_share(count));
            }
            println!("Age groups");
            for bucket in &stats.age_groups {
                println!(
                    "  {:<12} {:>4}  {:>3}%",
                    bucket.label,
                    bucket.count,
                    stats.age_share(bucket.count)
                );
            }
        }
    }
    Ok(())
}

fn store_config(args: &Args) -> anyhow::Result<StoreConfig> {
    let mut config = StoreConfig::from_env()?;
    if let Some(url) = &args.api_url {
        config.base_url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    Ok(config)
}

fn open_session(args: &Args) -> anyhow::Result<SessionContext> {
    let path = match &args.session_file {
        Some(path) => path.clone(),
        None => SessionContext::default_path().context("no config directory for the session file")?,
    };
    Ok(SessionContext::init(path)?)
}

fn require_session(args: &Args) -> anyhow::Result<Session> {
    let context = open_session(args)?;
    match context.current() {
        Some(session) => Ok(session.clone()),
        None => bail!("not signed in; run `labreport sign-in --email <address>` first"),
    }
}

async fn list(
    store: &HttpDataStore,
    what: ListTarget,
    classifier: &Classifier,
) -> anyhow::Result<()> {
    match what {
        ListTarget::Patients => {
            for patient in store.list_patients().await? {
                println!(
                    "{:>5}  {:<10} {:<24} {:>3} {:<7} {}",
                    patient.id,
                    patient.patient_code,
                    patient.full_name,
                    patient.age,
                    patient.gender,
                    patient.contact_number
                );
            }
        }
        ListTarget::Tests => {
            for test in store.list_tests().await? {
                let status = classifier.classify(&test.test_value, &test.normal_range);
                println!(
                    "{:>5}  {:<24} {:<28} {:>8} {:<10} {:<18} {}",
                    test.id,
                    test.patient_name,
                    test.test_name,
                    test.test_value,
                    test.unit,
                    test.normal_range,
                    status
                );
            }
        }
        ListTarget::Labs => {
            for lab in store.list_labs().await? {
                println!(
                    "{:>5}  {:<28} {} | {} | {}",
                    lab.id, lab.name, lab.address, lab.phone, lab.email
                );
            }
        }
    }
    Ok(())
}

fn print_catalog(category: Option<&str>, json: bool) -> anyhow::Result<()> {
    let catalog = Catalog::builtin();
    if json {
        let groups: Vec<_> = catalog
            .tests_by_category()
            .into_iter()
            .filter(|group| category.map_or(true, |wanted| group.category == wanted))
            .collect();
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    let categories: Vec<&str> = match category {
        Some(wanted) if catalog.categories().contains(&wanted) => vec![wanted],
        Some(wanted) => bail!("unknown test category {wanted:?}"),
        None => catalog.categories(),
    };
    for name in categories {
        println!("{name}");
        for definition in catalog.tests_in(name) {
            println!(
                "  {:<32} {:<12} {}",
                definition.name, definition.unit, definition.reference_range
            );
        }
    }
    Ok(())
}

fn print_stats(stats: &DashboardStats) {
    println!(
        "Patients: {}  Tests: {}  Today: {}  Out of range: {}  Reports: {}",
        stats.total_patients,
        stats.total_tests,
        stats.tests_today,
        stats.out_of_range_results,
        stats.reports_generated
    );
}

fn emit_view(view: &ReportView, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    if let Some(lab) = &view.lab {
        println!("{}", lab.name.to_uppercase());
        if let Some(slogan) = &lab.slogan {
            println!("{slogan}");
        }
        println!("{} | {} | {}", lab.address, lab.phone, lab.email);
        println!();
    }
    println!("LABORATORY INVESTIGATION REPORT");
    println!("Name: {:<30} Age/Sex: {}", view.patient_name, view.age_sex);
    println!("Patient ID: {:<24} Contact: {}", view.patient_code, view.patient_contact);
    println!("REF. BY: {:<27} Lab Ref No: {}", view.ref_by, view.lab_ref_no);
    println!("Generated: {}", view.generated_at.format("%Y-%m-%d %H:%M UTC"));

    for section in &view.sections {
        println!();
        println!("{}", section.heading);
        for row in &section.rows {
            println!(
                "  {:<32} {:>10} {:<10} {:<20} {}",
                row.test.test_name,
                row.display_value(),
                row.test.unit,
                row.test.normal_range,
                row.status
            );
            if let Some(note) = &row.test.additional_note {
                println!("    note: {note}");
            }
        }
    }

    let summary = &view.summary;
    println!();
    println!(
        "{} results, {} out of range, {} flagged, {} unclassified",
        summary.total, summary.out_of_range, summary.alerts, summary.unclassified
    );
    Ok(())
}
