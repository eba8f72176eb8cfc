//! Functions that talk to Microsoft Graph directly.
//!
//! The seven backend operations keep their interact names so a prompt
//! resolves the same way against either catalog. [`run_action`] is shared
//! with the REST backend, which serves the same replies over HTTP.

use std::sync::Arc;

use serde_json::{Value, json};
use toolcat_core::{
    ArgumentPolicy, Catalog, CatalogError, FunctionSpec, ParameterSchema, ParameterSpec,
    config::AuthMode,
};
use toolcat_graph::{GraphClient, GraphError, report};
use tracing::{info, instrument};

use crate::interact::InteractAction;

pub const TEST_MAIL_SUBJECT: &str = "Testing Microsoft Graph";
pub const TEST_MAIL_BODY: &str = "Hello world!";

/// Runs one backend operation against Graph.
///
/// Replies: `{"access_token"}` for 1, the raw inbox messages for 2,
/// `{"status"}` for 3, and report lines for 4 to 7.
#[instrument(skip(client))]
pub async fn run_action(
    client: &GraphClient,
    action: InteractAction,
    search_term: Option<&str>,
) -> Result<Value, GraphError> {
    let reply = match action {
        InteractAction::DisplayAccessToken => {
            json!({"access_token": client.access_token().await?.secret})
        }
        InteractAction::ListInbox => json!(client.get_inbox().await?),
        InteractAction::SendMail => {
            let recipient = client.user_address().await?;
            client
                .send_mail(TEST_MAIL_SUBJECT, TEST_MAIL_BODY, &recipient)
                .await?;
            info!(%recipient, "Sent test mail");
            json!({"status": "Mail sent."})
        }
        InteractAction::ExtractEmailMetadata => json!(report::email_metadata(client).await?),
        InteractAction::ExtractCalendarEvents => json!(report::calendar_events(client).await?),
        InteractAction::ExtractContacts => json!(report::contacts(client).await?),
        InteractAction::ExtractSharepointUsage => {
            json!(report::sharepoint_usage(client, search_term).await)
        }
    };
    Ok(reply)
}

fn send_mail_spec() -> FunctionSpec {
    FunctionSpec::new(
        "send_mail",
        "Send a plain-text email. Without a recipient it goes to the signed-in user",
        ParameterSchema::new()
            .required("subject", ParameterSpec::string("Subject line"))
            .required("body", ParameterSpec::string("Plain-text message body"))
            .optional(
                "recipient",
                ParameterSpec::string("Recipient email address"),
            ),
    )
}

/// Interact functions plus `get_user`, To Do/Planner, OneDrive, and
/// `extract_inference_data`, running in-process against `client`.
///
/// `send_mail` takes `subject`, `body`, and an optional `recipient` instead
/// of sending the fixed test message. `mode` decides whether the delegated
/// extractors are registered.
pub fn directory_catalog(
    client: GraphClient,
    mode: AuthMode,
    policy: ArgumentPolicy,
) -> Result<Catalog, CatalogError> {
    let client = Arc::new(client);
    let mut catalog = Catalog::with_policy(policy);

    {
        let client = Arc::clone(&client);
        catalog.register_fn(
            FunctionSpec::new(
                "get_user",
                "Get the display name and email of the signed-in user",
                ParameterSchema::placeholder("dummy"),
            ),
            move |_| {
                let client = Arc::clone(&client);
                async move {
                    let user = client.get_user().await?;
                    anyhow::Ok(json!({
                        "displayName": user.display_name,
                        "email": user.email(),
                    }))
                }
            },
        )?;
    }

    for action in InteractAction::ALL {
        let client = Arc::clone(&client);
        if action == InteractAction::SendMail {
            catalog.register_fn(send_mail_spec(), move |args| {
                let client = Arc::clone(&client);
                async move {
                    let subject: String = args.required("subject")?;
                    let body: String = args.required("body")?;
                    let recipient = match args.optional::<String>("recipient")? {
                        Some(recipient) => recipient,
                        None => client.user_address().await?,
                    };
                    client.send_mail(&subject, &body, &recipient).await?;
                    anyhow::Ok(json!({"status": "Mail sent.", "recipient": recipient}))
                }
            })?;
            continue;
        }

        let spec = match action {
            InteractAction::ExtractSharepointUsage => FunctionSpec::new(
                action.function_name(),
                "Extract SharePoint usage information",
                ParameterSchema::new().optional(
                    "search_term",
                    ParameterSpec::string("Search term to filter SharePoint sites"),
                ),
            ),
            _ => action.spec(),
        };
        catalog.register_fn(spec, move |args| {
            let client = Arc::clone(&client);
            async move {
                let search_term: Option<String> = args.optional("search_term")?;
                anyhow::Ok(run_action(&client, action, search_term.as_deref()).await?)
            }
        })?;
    }

    if mode == AuthMode::User {
        let tasks_client = Arc::clone(&client);
        catalog.register_fn(
            FunctionSpec::new(
                "extract_task_management",
                "Extract To Do task lists and Planner plans",
                ParameterSchema::placeholder("dummy"),
            ),
            move |_| {
                let client = Arc::clone(&tasks_client);
                async move { anyhow::Ok(json!(report::task_management(&client).await?)) }
            },
        )?;

        let drive_client = Arc::clone(&client);
        catalog.register_fn(
            FunctionSpec::new(
                "extract_onedrive_usage",
                "Extract OneDrive storage usage and root files",
                ParameterSchema::placeholder("dummy"),
            ),
            move |_| {
                let client = Arc::clone(&drive_client);
                async move { anyhow::Ok(json!(report::onedrive_usage(&client).await?)) }
            },
        )?;
    }

    let client = Arc::clone(&client);
    catalog.register_fn(
        FunctionSpec::new(
            "extract_inference_data",
            "Extract every available summary of the user's mail, calendar, contacts, and files",
            ParameterSchema::placeholder("dummy"),
        ),
        move |_| {
            let client = Arc::clone(&client);
            async move { anyhow::Ok(json!(report::inference_data(&client, mode).await?)) }
        },
    )?;

    Ok(catalog)
}
