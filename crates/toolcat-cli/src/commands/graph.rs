//! `toolcat graph`: Microsoft Graph flows without a model.

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use console::style;
use toolcat_core::{Config, config::AuthMode};
use toolcat_graph::{GraphClient, report, types::Recipient};

use crate::catalogs;

#[derive(Args)]
pub struct GraphArgs {
    #[command(subcommand)]
    pub command: GraphCommand,
}

#[derive(Subcommand)]
pub enum GraphCommand {
    /// Greet the signed-in user
    User,
    /// Print an access token
    Token,
    /// List the newest inbox messages
    Inbox,
    /// Send a plain-text email
    SendMail(SendMailArgs),
    /// Print a text extract
    Extract(ExtractArgs),
}

#[derive(Args)]
pub struct SendMailArgs {
    #[arg(long, default_value = toolcat_tools::directory::TEST_MAIL_SUBJECT)]
    pub subject: String,

    #[arg(long, default_value = toolcat_tools::directory::TEST_MAIL_BODY)]
    pub body: String,

    /// Recipient address. Defaults to the signed-in user.
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args)]
pub struct ExtractArgs {
    #[arg(value_enum)]
    pub report: Report,

    /// Site search term for the SharePoint extract.
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Report {
    Email,
    Calendar,
    Contacts,
    Tasks,
    Onedrive,
    Sharepoint,
    /// Every extract available to the configured auth mode
    All,
}

pub async fn run(args: &GraphArgs, config: &Config) -> Result<()> {
    let client = catalogs::graph_client(config)?;

    match &args.command {
        GraphCommand::User => {
            let user = client.get_user().await.context("failed to get user")?;
            println!(
                "Hello, {}",
                style(user.display_name.as_deref().unwrap_or("N/A")).bold()
            );
            println!("Email: {}", user.email().unwrap_or("N/A"));
        }
        GraphCommand::Token => {
            let token = client.access_token().await.context("failed to get token")?;
            println!("User token: {}", token.secret);
        }
        GraphCommand::Inbox => {
            let messages = client.get_inbox().await.context("failed to list inbox")?;
            for message in &messages {
                println!("Message: {}", message.subject.as_deref().unwrap_or("NONE"));
                println!(
                    "  From: {}",
                    message
                        .from
                        .as_ref()
                        .and_then(Recipient::address)
                        .unwrap_or("NONE")
                );
                let status = if message.is_read.unwrap_or(false) { "Read" } else { "Unread" };
                println!("  Status: {status}");
                println!(
                    "  Received: {}",
                    message.received_date_time.as_deref().unwrap_or("NONE")
                );
            }
        }
        GraphCommand::SendMail(mail) => {
            let recipient = send_mail(&client, mail).await?;
            println!("{} Mail sent to {recipient}.", style("✓").green().bold());
        }
        GraphCommand::Extract(extract) => {
            for line in extract_lines(&client, config.graph.mode, extract).await? {
                println!("{line}");
            }
        }
    }
    Ok(())
}

async fn send_mail(client: &GraphClient, args: &SendMailArgs) -> Result<String> {
    let recipient = match &args.to {
        Some(to) => to.clone(),
        None => client
            .user_address()
            .await
            .context("failed to resolve the signed-in user's address")?,
    };
    client
        .send_mail(&args.subject, &args.body, &recipient)
        .await
        .context("failed to send mail")?;
    Ok(recipient)
}

pub(crate) async fn extract_lines(
    client: &GraphClient,
    mode: AuthMode,
    args: &ExtractArgs,
) -> Result<Vec<String>> {
    let lines = match args.report {
        Report::Email => report::email_metadata(client).await?,
        Report::Calendar => report::calendar_events(client).await?,
        Report::Contacts => report::contacts(client).await?,
        Report::Tasks => report::task_management(client).await?,
        Report::Onedrive => report::onedrive_usage(client).await?,
        Report::Sharepoint => report::sharepoint_usage(client, args.search.as_deref()).await,
        Report::All => report::inference_data(client, mode).await?,
    };
    Ok(lines)
}
