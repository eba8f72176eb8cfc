//! Plain-text extracts of a user's Graph data.
//!
//! Each extractor returns one line per record, ready to print or to hand to a
//! language model as context. Missing values render as `N/A`.

use serde_json::Value;
use toolcat_core::config::AuthMode;
use tracing::{instrument, warn};

use crate::{
    client::{GraphClient, GraphError},
    types::{DateTimeTimeZone, Recipient},
};

const MISSING: &str = "N/A";

fn or_missing(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING)
}

fn date_time(value: Option<&DateTimeTimeZone>) -> &str {
    or_missing(value.and_then(|dt| dt.date_time.as_deref()))
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// `Subject: …, From: …, Received: …, Read: …` for the newest inbox messages.
#[instrument(skip(client))]
pub async fn email_metadata(client: &GraphClient) -> Result<Vec<String>, GraphError> {
    let messages = client.get_inbox().await?;
    Ok(messages
        .iter()
        .map(|m| {
            format!(
                "Subject: {}, From: {}, Received: {}, Read: {}",
                or_missing(m.subject.as_deref()),
                or_missing(m.from.as_ref().and_then(Recipient::address)),
                or_missing(m.received_date_time.as_deref()),
                display(m.is_read),
            )
        })
        .collect())
}

/// `Subject: …, Start: …, End: …, Location: …` for recent calendar events.
#[instrument(skip(client))]
pub async fn calendar_events(client: &GraphClient) -> Result<Vec<String>, GraphError> {
    let events = client.list_events().await?;
    Ok(events
        .iter()
        .map(|e| {
            format!(
                "Subject: {}, Start: {}, End: {}, Location: {}",
                or_missing(e.subject.as_deref()),
                date_time(e.start.as_ref()),
                date_time(e.end.as_ref()),
                or_missing(e.location.as_ref().and_then(|l| l.display_name.as_deref())),
            )
        })
        .collect())
}

/// `Name: …, Email: …` per contact, using the first listed address.
#[instrument(skip(client))]
pub async fn contacts(client: &GraphClient) -> Result<Vec<String>, GraphError> {
    let contacts = client.list_contacts().await?;
    if contacts.is_empty() {
        return Ok(vec!["No contacts found.".to_string()]);
    }

    Ok(contacts
        .iter()
        .map(|c| {
            format!(
                "Name: {}, Email: {}",
                or_missing(c.display_name.as_deref()),
                or_missing(c.email_addresses.first().and_then(|a| a.address.as_deref())),
            )
        })
        .collect())
}

/// To Do lists with their tasks, followed by Planner plans.
#[instrument(skip(client))]
pub async fn task_management(client: &GraphClient) -> Result<Vec<String>, GraphError> {
    let mut lines = Vec::new();

    let todo_lists = client.list_todo_lists().await?;
    if todo_lists.is_empty() {
        lines.push("No task lists found.".to_string());
    }
    for list in &todo_lists {
        lines.push(format!(
            "Task List: {}",
            or_missing(list.display_name.as_deref())
        ));
        let tasks = client.list_todo_tasks(&list.id).await?;
        if tasks.is_empty() {
            lines.push("No tasks found in this list.".to_string());
        }
        for task in &tasks {
            lines.push(format!(
                "Task: {}, Due: {}, Completed: {}",
                or_missing(task.title.as_deref()),
                date_time(task.due_date_time.as_ref()),
                task.is_completed(),
            ));
        }
    }

    let plans = client.list_planner_plans().await?;
    if plans.is_empty() {
        lines.push("No Planner plans found.".to_string());
    }
    for plan in &plans {
        lines.push(format!("Planner Plan: {}", or_missing(plan.title.as_deref())));
    }

    Ok(lines)
}

/// `Item: …, Size: …, Modified: …` for the drive root.
#[instrument(skip(client))]
pub async fn onedrive_usage(client: &GraphClient) -> Result<Vec<String>, GraphError> {
    // Fails early when the user has no provisioned drive.
    client.get_drive().await?;
    let items = client.list_drive_root_children().await?;
    Ok(items
        .iter()
        .map(|item| {
            format!(
                "Item: {}, Size: {}, Modified: {}",
                or_missing(item.name.as_deref()),
                display(item.size),
                or_missing(item.last_modified_date_time.as_deref()),
            )
        })
        .collect())
}

/// Sites with their lists and list items.
///
/// Never fails: a Graph error becomes the final line
/// `Error extracting SharePoint usage: …`, after whatever was collected.
#[instrument(skip(client))]
pub async fn sharepoint_usage(client: &GraphClient, search: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Err(e) = collect_sharepoint(client, search, &mut lines).await {
        warn!(error = %e, "SharePoint extraction failed");
        lines.push(format!("Error extracting SharePoint usage: {e}"));
    }
    lines
}

async fn collect_sharepoint(
    client: &GraphClient,
    search: Option<&str>,
    lines: &mut Vec<String>,
) -> Result<(), GraphError> {
    let sites = client.list_sites(search).await?;
    if sites.is_empty() {
        lines.push(match search {
            Some(term) => format!("No SharePoint sites found for search term '{term}'"),
            None => "No SharePoint sites found.".to_string(),
        });
        return Ok(());
    }

    for site in &sites {
        let name = site.display_name.as_deref().or(site.web_url.as_deref());
        lines.push(format!("Site: {}", or_missing(name)));

        let lists = client.list_site_lists(&site.id).await?;
        if lists.is_empty() {
            lines.push("  No lists found in this site.".to_string());
        }
        for list in &lists {
            lines.push(format!(
                "  List: {}",
                or_missing(list.display_name.as_deref())
            ));

            let items = client.list_list_items(&site.id, &list.id).await?;
            if items.is_empty() {
                lines.push("    No items found in this list.".to_string());
            }
            for fields in items.into_iter().filter_map(|item| item.fields) {
                lines.push(format!("    Item: {}", Value::Object(fields)));
            }
        }
    }
    Ok(())
}

/// Runs every extractor available to `mode`, in a fixed order.
///
/// App-only access skips To Do, Planner, and OneDrive, which need a
/// delegated token.
#[instrument(skip(client))]
pub async fn inference_data(
    client: &GraphClient,
    mode: AuthMode,
) -> Result<Vec<String>, GraphError> {
    let mut lines = email_metadata(client).await?;
    lines.extend(calendar_events(client).await?);
    lines.extend(contacts(client).await?);
    if mode == AuthMode::User {
        lines.extend(task_management(client).await?);
        lines.extend(onedrive_usage(client).await?);
    }
    lines.extend(sharepoint_usage(client, None).await);
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::{auth::StaticToken, client::Principal};

    fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(
            reqwest::Client::new(),
            &format!("{}/v1.0", server.uri()),
            Principal::Me,
            Arc::new(StaticToken::new("test-token")),
        )
        .unwrap()
    }

    async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_email_metadata_lines() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1.0/me/mailFolders/inbox/messages",
            json!({"value": [
                {
                    "subject": "Budget",
                    "from": {"emailAddress": {"address": "cfo@contoso.com"}},
                    "receivedDateTime": "2024-05-01T09:30:00Z",
                    "isRead": false
                },
                {"subject": "No sender"}
            ]}),
        )
        .await;

        let lines = email_metadata(&client(&server)).await.unwrap();
        assert_eq!(
            lines,
            [
                "Subject: Budget, From: cfo@contoso.com, Received: 2024-05-01T09:30:00Z, Read: false",
                "Subject: No sender, From: N/A, Received: N/A, Read: N/A",
            ]
        );
    }

    #[tokio::test]
    async fn test_calendar_event_lines() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1.0/me/calendar/events",
            json!({"value": [{
                "subject": "Standup",
                "start": {"dateTime": "2024-05-02T09:00:00.0000000", "timeZone": "UTC"},
                "end": {"dateTime": "2024-05-02T09:15:00.0000000", "timeZone": "UTC"},
                "location": {"displayName": "Room 4"}
            }]}),
        )
        .await;

        let lines = calendar_events(&client(&server)).await.unwrap();
        assert_eq!(
            lines,
            ["Subject: Standup, Start: 2024-05-02T09:00:00.0000000, End: 2024-05-02T09:15:00.0000000, Location: Room 4"]
        );
    }

    #[tokio::test]
    async fn test_contacts_without_records() {
        let server = MockServer::start().await;
        mount_get(&server, "/v1.0/me/contacts", json!({"value": []})).await;

        let lines = contacts(&client(&server)).await.unwrap();
        assert_eq!(lines, ["No contacts found."]);
    }

    #[tokio::test]
    async fn test_contacts_use_first_address_or_placeholder() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1.0/me/contacts",
            json!({"value": [
                {"displayName": "Ada", "emailAddresses": [{"address": "ada@contoso.com"}, {"address": "ada@home.net"}]},
                {"displayName": "Bob", "emailAddresses": []}
            ]}),
        )
        .await;

        let lines = contacts(&client(&server)).await.unwrap();
        assert_eq!(
            lines,
            ["Name: Ada, Email: ada@contoso.com", "Name: Bob, Email: N/A"]
        );
    }

    #[tokio::test]
    async fn test_task_management_lines() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1.0/me/todo/lists",
            json!({"value": [
                {"id": "l1", "displayName": "Work"},
                {"id": "l2", "displayName": "Empty"}
            ]}),
        )
        .await;
        mount_get(
            &server,
            "/v1.0/me/todo/lists/l1/tasks",
            json!({"value": [{
                "title": "File report",
                "status": "completed",
                "dueDateTime": {"dateTime": "2024-05-03T00:00:00.0000000", "timeZone": "UTC"}
            }]}),
        )
        .await;
        mount_get(&server, "/v1.0/me/todo/lists/l2/tasks", json!({"value": []})).await;
        mount_get(&server, "/v1.0/me/planner/plans", json!({"value": []})).await;

        let lines = task_management(&client(&server)).await.unwrap();
        assert_eq!(
            lines,
            [
                "Task List: Work",
                "Task: File report, Due: 2024-05-03T00:00:00.0000000, Completed: true",
                "Task List: Empty",
                "No tasks found in this list.",
                "No Planner plans found.",
            ]
        );
    }

    #[tokio::test]
    async fn test_onedrive_usage_lines() {
        let server = MockServer::start().await;
        mount_get(&server, "/v1.0/me/drive", json!({"id": "drive-1"})).await;
        mount_get(
            &server,
            "/v1.0/me/drive/root/children",
            json!({"value": [{
                "name": "notes.txt",
                "size": 120,
                "lastModifiedDateTime": "2024-04-30T12:00:00Z"
            }]}),
        )
        .await;

        let lines = onedrive_usage(&client(&server)).await.unwrap();
        assert_eq!(
            lines,
            ["Item: notes.txt, Size: 120, Modified: 2024-04-30T12:00:00Z"]
        );
    }

    #[tokio::test]
    async fn test_sharepoint_usage_walks_sites_lists_and_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites"))
            .and(query_param("search", "finance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [
                {"id": "s1", "displayName": "Finance"},
                {"id": "s2", "webUrl": "https://contoso.sharepoint.com/sites/empty"}
            ]})))
            .mount(&server)
            .await;
        mount_get(
            &server,
            "/v1.0/sites/s1/lists",
            json!({"value": [{"id": "l1", "displayName": "Budgets"}]}),
        )
        .await;
        mount_get(
            &server,
            "/v1.0/sites/s1/lists/l1/items",
            json!({"value": [{"id": "1", "fields": {"Title": "FY24"}}]}),
        )
        .await;
        mount_get(&server, "/v1.0/sites/s2/lists", json!({"value": []})).await;

        let lines = sharepoint_usage(&client(&server), Some("finance")).await;
        assert_eq!(
            lines,
            [
                "Site: Finance",
                "  List: Budgets",
                r#"    Item: {"Title":"FY24"}"#,
                "Site: https://contoso.sharepoint.com/sites/empty",
                "  No lists found in this site.",
            ]
        );
    }

    #[tokio::test]
    async fn test_sharepoint_usage_reports_empty_search() {
        let server = MockServer::start().await;
        mount_get(&server, "/v1.0/sites", json!({"value": []})).await;

        let lines = sharepoint_usage(&client(&server), Some("nothing")).await;
        assert_eq!(lines, ["No SharePoint sites found for search term 'nothing'"]);

        let lines = sharepoint_usage(&client(&server), None).await;
        assert_eq!(lines, ["No SharePoint sites found."]);
    }

    #[tokio::test]
    async fn test_sharepoint_usage_folds_errors_into_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let lines = sharepoint_usage(&client(&server), None).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Error extracting SharePoint usage: "));
        assert!(lines[0].contains("Forbidden"));
    }

    #[tokio::test]
    async fn test_inference_data_skips_delegated_extractors_in_app_mode() {
        let server = MockServer::start().await;
        mount_get(
            &server,
            "/v1.0/me/mailFolders/inbox/messages",
            json!({"value": []}),
        )
        .await;
        mount_get(&server, "/v1.0/me/calendar/events", json!({"value": []})).await;
        mount_get(&server, "/v1.0/me/contacts", json!({"value": []})).await;
        mount_get(&server, "/v1.0/sites", json!({"value": []})).await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/todo/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(0)
            .mount(&server)
            .await;

        let lines = inference_data(&client(&server), AuthMode::App).await.unwrap();
        assert_eq!(lines, ["No contacts found.", "No SharePoint sites found."]);
    }
}
