use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use textproc_client::api::{JobClient, JobError};
use textproc_client::cli::{
    should_report, Cli, Command, ProcessArgs, SettingsCommand, SettingsUpdate,
};
use textproc_client::config::settings::parse_worker_limit;
use textproc_client::config::settings_store::SettingsStore;
use textproc_client::notifications::Notifier;
use textproc_client::services::{ProcessEvent, Session, DEFAULT_PROMPT};
use textproc_client::utils::app_paths::AppPaths;
use textproc_client::utils::logging;
use textproc_client::yank_manager::YankOutcome;
use tokio_util::sync::CancellationToken;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut session = match open_session(&cli) {
        Ok(session) => session,
        Err(e) => {
            Notifier::new(false).error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };
    let notifier = Notifier::new(session.settings().dark_mode);

    let outcome = match cli.command {
        Command::Process(args) => process(&mut session, &notifier, args).await,
        Command::Check => check(&session, &notifier).await,
        Command::Health => health(&session, &notifier).await,
        Command::Settings(SettingsCommand::Show) => {
            show_settings(&session);
            Ok(())
        }
        Command::Settings(SettingsCommand::Set(update)) => {
            set_settings(&mut session, &notifier, update)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if !should_report(&e) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            notifier.error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn open_session(cli: &Cli) -> Result<Session> {
    let store = match &cli.settings_dir {
        Some(dir) => SettingsStore::new(dir),
        None => SettingsStore::default_location()?,
    };
    let client = JobClient::http(&cli.server)?;
    if cli.command.can_replace_settings() {
        Ok(Session::open_or_default(client, store))
    } else {
        Session::open(client, store)
    }
}

async fn process(session: &mut Session, notifier: &Notifier, args: ProcessArgs) -> Result<()> {
    let text = read_input(args.input.as_deref())?;
    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt from {}", path.display()))?,
        (None, None) => DEFAULT_PROMPT.to_string(),
    };

    if !session.settings().has_api_key() {
        return Err(anyhow!(
            "Please set your API key first: textproc settings set --api-key <KEY>"
        ));
    }

    let cancel = CancellationToken::new();
    watch_for_cancellation(&cancel, args.timeout);

    let outcome = session
        .process_text(
            &text,
            &prompt,
            |event| match event {
                ProcessEvent::Connected => {
                    notifier.info("Connection successful, starting processing...")
                }
                ProcessEvent::Submitted { job_id } => notifier.info(&format!("Job {} started", job_id)),
                ProcessEvent::Progress(progress) => notifier.progress(progress),
            },
            Duration::from_millis(args.poll_ms.max(1)),
            &cancel,
        )
        .await;
    notifier.finish_progress();

    let result = match outcome {
        Ok(result) => result,
        Err(JobError::Cancelled) => {
            notifier.warning("Stopped waiting; the job keeps running on the server");
            return Err(JobError::Cancelled.into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", result);
    notifier.success("Text processing completed successfully!");

    let save_dir = match args.save_to {
        Some(dir) => Some(dir),
        None if args.save => Some(AppPaths::download_dir()),
        None => None,
    };
    if let Some(dir) = save_dir {
        let path = session.export_result(&dir)?;
        notifier.success(&format!("Saved to {}", path.display()));
    }

    if args.copy {
        match session.copy_result()? {
            YankOutcome::Copied { chars } => {
                notifier.success(&format!("Copied {} characters to clipboard", chars))
            }
            YankOutcome::ManualFallback { reason, .. } => notifier.warning(&format!(
                "Clipboard unavailable ({}); copy the result above manually",
                reason
            )),
        }
    }

    Ok(())
}

/// Ctrl-C and `--timeout` both end observation through the same token
fn watch_for_cancellation(cancel: &CancellationToken, timeout_secs: Option<u64>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            token.cancel();
        });
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

async fn check(session: &Session, notifier: &Notifier) -> Result<()> {
    if !session.settings().has_api_key() {
        return Err(anyhow!("No API key saved"));
    }
    session.check_connection().await?;
    notifier.success("Connection successful");
    Ok(())
}

async fn health(session: &Session, notifier: &Notifier) -> Result<()> {
    let report = session.client().health().await?;
    notifier.success(&format!("Server status: {}", report.status));
    Ok(())
}

fn show_settings(session: &Session) {
    let settings = session.settings();
    println!("API key:     {}", settings.masked_api_key());
    println!("Base URL:    {}", settings.base_url);
    println!("Model:       {}", settings.model);
    println!("Max workers: {}", settings.max_workers);
    println!("Dark mode:   {}", settings.dark_mode);
}

fn set_settings(session: &mut Session, notifier: &Notifier, update: SettingsUpdate) -> Result<()> {
    if update.is_empty() {
        return Err(anyhow!("Nothing to change; see textproc settings set --help"));
    }

    session.update_settings(|settings| {
        if let Some(api_key) = update.api_key {
            settings.api_key = api_key;
        }
        if let Some(base_url) = update.base_url {
            settings.base_url = base_url;
        }
        if let Some(model) = update.model {
            settings.model = model;
        }
        if let Some(workers) = update.max_workers {
            settings.max_workers = parse_worker_limit(&workers);
        }
        if let Some(dark_mode) = update.dark_mode {
            settings.dark_mode = dark_mode;
        }
    })?;

    notifier.success("Settings saved successfully!");
    Ok(())
}
