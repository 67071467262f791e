//! Mailkit CLI - command line client for the Resend API.
//!
//! Covers sending (plain, batch, scheduled, with attachments), contacts and
//! audiences, domains, and both halves of the double opt-in flow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailkit::config::load_dotenv;
use mailkit::optin::{self, OptInSettings};
use mailkit::resend::{
    Attachment, ContactDirectory, CreateContact, EmailTemplate, EmailTransport, ResendClient,
    SendEmail, UpdateContact,
};
use mailkit::web::handlers::TEMPLATE_SUBJECT;
use mailkit::webhook::{self, EmailEventData, WebhookEvent};
use mailkit::{Config, Dispatcher, WebhookVerifier};

#[derive(Parser)]
#[command(name = "mailkit", version, about = "Resend API toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    Api(ApiCommand),
    /// Print svix headers for a payload file, for exercising `mailkit-web` locally
    SignWebhook {
        body_file: PathBuf,
        #[arg(long)]
        id: Option<String>,
    },
}

/// Commands that talk to the Resend API.
#[derive(Subcommand)]
enum ApiCommand {
    /// Send one email
    Send(SendArgs),
    /// Send a template published in the Resend dashboard
    SendTemplate {
        #[arg(long = "to", required = true)]
        to: Vec<String>,
        #[arg(long, env = "RESEND_TEMPLATE_ID")]
        template_id: String,
        #[arg(long, default_value = TEMPLATE_SUBJECT)]
        subject: String,
        /// Template variable as `NAME=value` (repeatable, case-sensitive)
        #[arg(long = "var")]
        vars: Vec<String>,
    },
    /// Send the same message to several recipients in one batch call
    Batch {
        #[arg(long = "to", required = true)]
        to: Vec<String>,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        html: String,
    },
    /// Show an email, including inbound ones reported by `email.received`
    Get { email_id: String },
    /// Cancel a scheduled email
    Cancel { email_id: String },
    /// List audiences
    Audiences,
    /// Manage contacts in the configured audience
    Contacts {
        #[command(subcommand)]
        command: ContactsCommand,
    },
    /// Inspect and verify sending domains
    Domains {
        #[command(subcommand)]
        command: DomainsCommand,
    },
    /// Start a double opt-in: pending contact plus confirmation email
    Subscribe { email: String, name: Option<String> },
    /// Confirm a pending contact as if its confirmation link was clicked
    Confirm { email: String },
}

#[derive(Args)]
struct SendArgs {
    #[arg(long = "to", required = true)]
    to: Vec<String>,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    html: Option<String>,
    #[arg(long)]
    text: Option<String>,
    /// File to attach (repeatable)
    #[arg(long = "attach")]
    attach: Vec<PathBuf>,
    /// Inline image as `path=content_id`; reference it as `cid:content_id`
    #[arg(long = "inline")]
    inline: Vec<String>,
    /// Extra header as `Name: value` (repeatable)
    #[arg(long = "header")]
    header: Vec<String>,
    /// Deliver this many minutes from now
    #[arg(long)]
    schedule_in_minutes: Option<i64>,
    /// Add a unique X-Entity-Ref-ID so Gmail does not thread the message
    #[arg(long)]
    unique_thread: bool,
}

#[derive(Subcommand)]
enum ContactsCommand {
    List,
    Create {
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        unsubscribed: bool,
    },
    Update {
        contact_id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        unsubscribed: Option<bool>,
    },
    Remove { contact_id: String },
}

#[derive(Subcommand)]
enum DomainsCommand {
    List,
    Get { domain_id: String },
    Verify { domain_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Api(command) => run(command, &config).await,
        Command::SignWebhook { body_file, id } => sign_webhook(&config, &body_file, id),
    }
}

async fn run(command: ApiCommand, config: &Config) -> Result<()> {
    let client = ResendClient::with_base_url(
        config.require_api_key()?,
        &config.api_base_url,
        config.request_timeout(),
    )
    .context("Failed to create Resend client")?;

    match command {
        ApiCommand::Send(args) => send(&client, config, args).await,
        ApiCommand::SendTemplate {
            to,
            template_id,
            subject,
            vars,
        } => {
            let mut template = EmailTemplate::new(&template_id);
            for var in &vars {
                let (name, value) = var
                    .split_once('=')
                    .with_context(|| format!("--var expects NAME=value, got {}", var))?;
                template = template.with_variable(name, value);
            }

            let email = SendEmail::new(&config.email_from, to, subject).with_template(template);
            let sent = client.send_email(&email).await.context("Error sending email")?;
            println!("Email sent successfully!");
            println!("Email ID: {}", sent.id);
            println!("Template ID: {}", template_id);
            Ok(())
        }
        ApiCommand::Batch { to, subject, html } => {
            let emails: Vec<SendEmail> = to
                .iter()
                .map(|recipient| {
                    SendEmail::new(&config.email_from, [recipient.as_str()], &subject)
                        .with_html(&html)
                })
                .collect();

            let sent = client.send_batch(&emails).await.context("Error sending batch")?;
            println!("Batch sent successfully!");
            for (i, email) in sent.iter().enumerate() {
                println!("Email {} ID: {}", i + 1, email.id);
            }
            Ok(())
        }
        ApiCommand::Get { email_id } => {
            let email = client.get_email(&email_id).await.context("Error fetching email")?;
            println!("From: {}", email.from);
            println!("To: {}", email.to.join(", "));
            println!("Subject: {}", email.subject);
            println!("Created: {}", email.created_at);
            if let Some(event) = &email.last_event {
                println!("Last event: {}", event);
            }
            if let Some(preview) = email.text_preview(200) {
                println!("\nText preview:\n{}", preview);
            }
            Ok(())
        }
        ApiCommand::Cancel { email_id } => {
            client.cancel_email(&email_id).await.context("Error cancelling email")?;
            println!("Email cancelled: {}", email_id);
            Ok(())
        }
        ApiCommand::Audiences => {
            let audiences = client.list_audiences().await.context("Error listing audiences")?;
            for audience in &audiences {
                println!("  - {} ({})", audience.name, audience.id);
            }
            Ok(())
        }
        ApiCommand::Contacts { command } => contacts(&client, config, command).await,
        ApiCommand::Domains { command } => domains(&client, command).await,
        ApiCommand::Subscribe { email, name } => {
            let settings = OptInSettings {
                audience_id: config.audience_id.clone(),
                from: config.email_from.clone(),
                confirm_url: config.confirm_redirect_url.clone(),
            };
            let subscription =
                optin::subscribe(&client, &client, &settings, &email, name.as_deref()).await?;

            println!("Double opt-in initiated!");
            println!("Contact ID: {}", subscription.contact_id);
            println!("Email ID: {}", subscription.email_id);
            println!("\nThe contact is confirmed when the recipient clicks the link,");
            println!("which Resend reports to /double-optin/webhook as email.clicked.");
            Ok(())
        }
        ApiCommand::Confirm { email } => {
            let verifier =
                WebhookVerifier::new(config.webhook_secret.clone(), config.webhook_tolerance());
            let dispatcher =
                Dispatcher::new(verifier, Arc::new(client), config.audience_id.clone());

            let event = WebhookEvent::EmailClicked(EmailEventData {
                to: vec![email],
                ..Default::default()
            });
            let outcome = dispatcher.dispatch(&event).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
    }
}

async fn send(client: &ResendClient, config: &Config, args: SendArgs) -> Result<()> {
    if args.html.is_none() && args.text.is_none() {
        bail!("one of --html or --text is required");
    }

    let mut email = SendEmail::new(&config.email_from, args.to, args.subject);
    if let Some(html) = args.html {
        email = email.with_html(html);
    }
    if let Some(text) = args.text {
        email = email.with_text(text);
    }

    for path in &args.attach {
        let attachment = Attachment::from_path(path)
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        email = email.with_attachment(attachment);
    }

    for inline in &args.inline {
        let (path, content_id) = inline
            .split_once('=')
            .with_context(|| format!("--inline expects path=content_id, got {}", inline))?;
        let attachment = Attachment::from_path(Path::new(path))
            .with_context(|| format!("Failed to read inline image {}", path))?
            .with_content_id(content_id);
        if let Some(src) = attachment.cid_src() {
            println!("Inline image {}: <img src=\"{}\">", path, src);
        }
        email = email.with_attachment(attachment);
    }

    for header in &args.header {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("--header expects 'Name: value', got {}", header))?;
        email = email.with_header(name.trim(), value.trim());
    }

    if args.unique_thread {
        email = email.with_unique_thread();
    }

    if let Some(minutes) = args.schedule_in_minutes {
        email = email.scheduled_in(chrono::Duration::minutes(minutes));
    }

    let sent = client.send_email(&email).await.context("Error sending email")?;
    println!("Email sent successfully!");
    println!("Email ID: {}", sent.id);
    if let Some(at) = &email.scheduled_at {
        println!("Scheduled for: {}", at);
    }
    Ok(())
}

async fn contacts(client: &ResendClient, config: &Config, command: ContactsCommand) -> Result<()> {
    let audience_id = config
        .audience_id
        .as_deref()
        .context("RESEND_AUDIENCE_ID environment variable is required")?;

    match command {
        ContactsCommand::List => {
            let contacts = client
                .list_contacts(audience_id)
                .await
                .context("Error listing contacts")?;
            for c in &contacts {
                println!(
                    "  - {} {} <{}> (unsubscribed: {}, id: {})",
                    c.first_name.as_deref().unwrap_or(""),
                    c.last_name.as_deref().unwrap_or(""),
                    c.email,
                    c.unsubscribed,
                    c.id
                );
            }
        }
        ContactsCommand::Create {
            email,
            first_name,
            last_name,
            unsubscribed,
        } => {
            let mut contact = CreateContact::new(audience_id, email).with_unsubscribed(unsubscribed);
            if let Some(name) = first_name {
                contact = contact.with_first_name(name);
            }
            if let Some(name) = last_name {
                contact = contact.with_last_name(name);
            }
            let created = client
                .create_contact(&contact)
                .await
                .context("Error creating contact")?;
            println!("Contact created: {}", created.id);
        }
        ContactsCommand::Update {
            contact_id,
            first_name,
            last_name,
            unsubscribed,
        } => {
            let update = UpdateContact {
                first_name,
                last_name,
                unsubscribed,
            };
            client
                .update_contact(audience_id, &contact_id, &update)
                .await
                .context("Error updating contact")?;
            println!("Contact updated: {}", contact_id);
        }
        ContactsCommand::Remove { contact_id } => {
            client
                .remove_contact(audience_id, &contact_id)
                .await
                .context("Error removing contact")?;
            println!("Contact removed: {}", contact_id);
        }
    }

    Ok(())
}

async fn domains(client: &ResendClient, command: DomainsCommand) -> Result<()> {
    match command {
        DomainsCommand::List => {
            let domains = client.list_domains().await.context("Error listing domains")?;
            println!("Found {} domain(s)", domains.len());
            for domain in &domains {
                println!("  - {} (status: {}, id: {})", domain.name, domain.status, domain.id);
            }
        }
        DomainsCommand::Get { domain_id } => {
            let domain = client.get_domain(&domain_id).await.context("Error getting domain")?;
            println!("Name: {}", domain.name);
            println!("Status: {}", domain.status);
            println!("Region: {}", domain.region);
            println!("Created: {}", domain.created_at);
            if !domain.records.is_empty() {
                println!("\nDNS Records:");
                for record in &domain.records {
                    println!("  {}: {} -> {}", record.record_type, record.name, record.value);
                }
            }
        }
        DomainsCommand::Verify { domain_id } => {
            client
                .verify_domain(&domain_id)
                .await
                .context("Error verifying domain")?;
            println!("Domain verification initiated!");
        }
    }

    Ok(())
}

fn sign_webhook(config: &Config, body_file: &Path, id: Option<String>) -> Result<()> {
    let secret = config
        .webhook_secret
        .as_deref()
        .context("RESEND_WEBHOOK_SECRET environment variable is required")?;

    let body = std::fs::read(body_file)
        .with_context(|| format!("Failed to read {}", body_file.display()))?;
    let id = id.unwrap_or_else(|| format!("msg_{}", uuid::Uuid::new_v4().simple()));
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = webhook::sign(secret, &id, &timestamp, &body)?;

    println!("{}: {}", webhook::ID_HEADER, id);
    println!("{}: {}", webhook::TIMESTAMP_HEADER, timestamp);
    println!("{}: {}", webhook::SIGNATURE_HEADER, signature);
    Ok(())
}
