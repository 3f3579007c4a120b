use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod controller;
mod domain;
mod forms;
mod inputter;
mod listview;
mod model;
mod notify;
mod resources;
mod session;
mod ui;

use api::RestClient;
use controller::Controller;
use domain::{VdConfig, VdError};
use model::{Model, Status};

#[derive(Parser, Debug)]
#[command(name = "vetdesk", version, about = "Terminal admin client for the vet-store back office")]
struct Args {
    /// Base URL of the REST backend
    #[arg(long, env = "VETDESK_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Session file written at login (defaults to the user config dir)
    #[arg(long, env = "VETDESK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Log file; the terminal itself belongs to the UI
    #[arg(long, default_value = "vetdesk.log")]
    log_file: PathBuf,

    /// Rows per page in list screens
    #[arg(long, default_value_t = 15)]
    page_size: usize,

    /// Store a fresh bearer token in the session file and exit. Token
    /// issuance itself happens against the backend's login endpoint.
    #[arg(long, value_name = "TOKEN")]
    save_token: Option<String>,

    /// Remove the stored session and exit
    #[arg(long)]
    logout: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: could not open log file: {e}");
        return ExitCode::FAILURE;
    }
    match run(args) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(args: &Args) -> Result<(), std::io::Error> {
    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file = std::fs::File::create(&args.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn default_session_file() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".config/vetdesk/session.json")
}

fn run(args: Args) -> Result<(), VdError> {
    let session_file = args.session_file.unwrap_or_else(default_session_file);

    if args.logout {
        session::clear(&session_file)?;
        println!("Logged out, session removed.");
        return Ok(());
    }

    if let Some(token) = args.save_token {
        let mut session = session::load(&session_file)?;
        session.token = token;
        session::save(&session_file, &session)?;
        println!("Token updated for {}.", session.user);
        return Ok(());
    }

    let session = session::load(&session_file)?;
    info!("Starting vetdesk for {} against {}", session.user, args.api_url);

    let cfg = VdConfig {
        api_base_url: args.api_url,
        event_poll_time: 100,
        page_size: args.page_size,
    };

    let client = RestClient::new(&cfg.api_base_url, &session.token)?;
    let (api_handle, api_events) = api::spawn_worker(client);

    let mut model = Model::new(cfg.clone(), session, Box::new(api_handle));
    let controller = Controller::new(&cfg, api_events);

    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        // Render the current view
        let uidata = model.ui();
        terminal.draw(|f| ui::draw(&uidata, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    Ok(())
}
