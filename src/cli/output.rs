//! Notification rendering.

use serde::Serialize;

use super::args::OutputFormat;
use crate::core::models::Entry;
use crate::core::service::DataType;
use crate::error::Result;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationLine<'a> {
    account: &'a str,
    data_type: DataType,
    entry: &'a Entry,
}

/// One output line for a delivered entry.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn render_notification(
    format: OutputFormat,
    account_id: &str,
    data_type: DataType,
    entry: &Entry,
) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(&NotificationLine {
            account: account_id,
            data_type,
            entry,
        })?),
        OutputFormat::Human => {
            let at = entry.fetched_at().format("%Y-%m-%d %H:%M:%S");
            Ok(match entry {
                Entry::Ok { data, .. } => {
                    format!("[{at}] {account_id} {data_type} ok {data}")
                }
                Entry::Err { kind, message, .. } => {
                    format!("[{at}] {account_id} {data_type} error ({}) {message}", kind.label())
                }
            })
        }
    }
}
