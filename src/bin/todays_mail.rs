use anyhow::{Result, anyhow};
use clap::Parser;

use todays_mail::app::{api_endpoint, run_all};
use todays_mail::auth::token_manager::TokenManager;
use todays_mail::config::load_config;
use todays_mail::domain::folder::WellKnownFolder;
use todays_mail::domain::today::today_cutoff;
use todays_mail::mail::autodiscover::Autodiscover;
use todays_mail::mail::graph::GraphMailService;
use todays_mail::mail::service::MailService;

#[derive(Parser)]
#[command(name = "todays_mail")]
#[command(about = "List what arrived in a mailbox's Inbox today, three different ways", long_about = None)]
struct Cli {
    /// SMTP address of the mailbox to search
    mailbox: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;

    let autodiscover = Autodiscover::new(cfg.autodiscover_url());
    let Some(endpoint) = api_endpoint(&cfg, &cli.mailbox, |mailbox| {
        autodiscover.resolve(mailbox)
    }) else {
        println!("Autodiscover failed");
        return Ok(());
    };

    let access_token = TokenManager::from_config(&cfg, &cli.mailbox)?.get_access_token()?;
    let service = GraphMailService::new(
        &endpoint,
        cfg.api_version(),
        cli.mailbox.as_str(),
        access_token,
    )?;

    let inbox = service.bind(WellKnownFolder::Inbox)?;
    let cutoff = today_cutoff()?;

    let stdout = std::io::stdout();
    run_all(&service, &inbox, cutoff, &mut stdout.lock())
}
