use std::io::BufRead;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use late_auth::{SecureStorage, GOOGLE_SERVICE};
use late_core::App;
use late_gmail::SendState;
use late_ui::{bridge, GoogleAuthModel, ScreenModel, Urgency, WidgetModel};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "late")]
#[command(about = "Let the attendees of your next meeting know you are running late")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with Google in the browser
    SignIn,
    /// Forget the stored session
    SignOut,
    /// Show the account, selected calendar, and config location
    Status,
    /// List your calendars
    Calendars,
    /// Select the calendar to watch
    Select {
        /// Calendar id as listed by `late calendars`
        calendar_id: String,
    },
    /// Show the next meeting
    Next,
    /// Email the attendees of the next meeting that you are running late
    Notify,
    /// Keep a status line for the next meeting on screen
    Widget {
        /// Print the status once and exit
        #[arg(long)]
        once: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    late_core::init()?;
    let app = App::new()?;
    bridge::init_runtime().context("Failed to start async runtime")?;

    tracing::info!("Late started");

    match cli.command {
        Commands::SignIn => sign_in(app),
        Commands::SignOut => {
            GoogleAuthModel::new(app)
                .sign_out()
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Signed out.");
            Ok(())
        }
        Commands::Status => status(&app),
        Commands::Calendars => calendars(app),
        Commands::Select { calendar_id } => {
            let mut screen = ScreenModel::new(app);
            screen
                .select_calendar(&calendar_id)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            wait_for(&mut screen);
            println!("{}", screen.render());
            Ok(())
        }
        Commands::Next => {
            let mut screen = ScreenModel::new(app);
            screen.refresh();
            wait_for(&mut screen);
            println!("{}", screen.render());
            Ok(())
        }
        Commands::Notify => notify(app),
        Commands::Widget { once } => widget(&app, once),
    }
}

fn wait_for(screen: &mut ScreenModel) {
    loop {
        screen.poll_channel();
        if !screen.is_busy() {
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn sign_in(app: App) -> Result<()> {
    let mut auth = GoogleAuthModel::new(app);
    auth.authenticate();
    if !auth.loading() {
        anyhow::bail!(auth.error_message().unwrap_or("Failed to log in. Please try again.").to_string());
    }

    println!("Opening the browser to sign in with Google...");
    while !auth.poll_channel() {
        std::thread::sleep(POLL_INTERVAL);
    }

    if let Some(message) = auth.error_message() {
        anyhow::bail!(message.to_string());
    }
    println!("Signed in as {}", auth.user_email().unwrap_or_default());
    Ok(())
}

fn status(app: &App) -> Result<()> {
    let prefs = app.prefs().load().context("Failed to read preferences")?;
    let storage = SecureStorage::new(app.config().tokens_dir());
    let config_path = late_core::Config::config_path()?;

    println!("Account:  {}", prefs.email.as_deref().unwrap_or("(not signed in)"));
    println!("Calendar: {}", prefs.calendar_id.as_deref().unwrap_or("(none selected)"));
    println!(
        "Token:    {}",
        match (prefs.token.is_some(), storage.has_token(GOOGLE_SERVICE)) {
            (true, true) => "stored, renewable",
            (true, false) => "stored",
            (false, _) => "missing",
        }
    );
    println!("Config:   {}", config_path.display());
    if !app.config().google.is_configured() {
        println!("\nGoogle OAuth is not configured. Add client_id and client_secret to the [google] section.");
    }
    Ok(())
}

fn calendars(app: App) -> Result<()> {
    let mut screen = ScreenModel::new(app);
    screen.load_calendars();
    wait_for(&mut screen);

    if let Some(message) = screen.error_message() {
        anyhow::bail!(message.to_string());
    }
    if screen.calendars().is_empty() {
        println!("No calendars found.");
    } else {
        println!("{}", screen.render_calendars());
    }
    Ok(())
}

fn notify(app: App) -> Result<()> {
    let mut screen = ScreenModel::new(app);
    screen.refresh();
    wait_for(&mut screen);

    if screen.next_event().is_none() {
        anyhow::bail!(screen.render());
    }

    screen.send_late_notice();
    wait_for(&mut screen);
    println!("{}", screen.render());

    match screen.send_state() {
        SendState::Sent => Ok(()),
        _ => anyhow::bail!("Failed to send email."),
    }
}

enum WidgetCommand {
    Send,
    Refresh,
    Quit,
}

/// Forward keyboard commands from stdin. Enter sends, `r` refreshes, `q` quits.
fn spawn_command_reader() -> mpsc::Receiver<WidgetCommand> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim() {
                "" | "s" => WidgetCommand::Send,
                "r" => WidgetCommand::Refresh,
                "q" => WidgetCommand::Quit,
                other => {
                    tracing::debug!("Ignoring widget input {:?}", other);
                    continue;
                }
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });
    rx
}

fn widget_line(widget: &WidgetModel) -> String {
    let now = chrono::Utc::now();
    let marker = match (widget.send_state(), widget.urgency(now)) {
        (SendState::Sent, _) => "[ok]",
        (SendState::Failed, _) | (_, Urgency::Imminent) => "[!!]",
        (_, Urgency::Reconfigure) | (_, Urgency::Upcoming) => "[..]",
        _ => "[  ]",
    };
    let action = if widget.can_send() { "   <Enter> Send email!" } else { "" };
    format!("{} {}{}", marker, widget.label(now), action)
}

fn widget(app: &App, once: bool) -> Result<()> {
    let mut widget = WidgetModel::new(app);
    widget.tick(Instant::now());

    if once {
        while widget.state().is_fetching() {
            std::thread::sleep(POLL_INTERVAL);
            widget.poll_channel(Instant::now());
        }
        println!("{}", widget.label(chrono::Utc::now()));
        return Ok(());
    }

    println!("r: refresh   q: quit");
    let commands = spawn_command_reader();
    let mut shown = String::new();

    loop {
        let now = Instant::now();
        widget.poll_channel(now);
        widget.tick(now);

        match commands.try_recv() {
            Ok(WidgetCommand::Send) => {
                if !widget.send() {
                    tracing::debug!("Send not available right now");
                }
            }
            Ok(WidgetCommand::Refresh) => widget.refresh(now),
            Ok(WidgetCommand::Quit) => break,
            Err(mpsc::TryRecvError::Empty) | Err(mpsc::TryRecvError::Disconnected) => {}
        }

        let line = widget_line(&widget);
        if line != shown {
            println!("{}", line);
            shown = line;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    Ok(())
}
