// CSV and JSON export of audit entries
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(AuditError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A rendered export ready to be sent as a file
#[derive(Debug, Clone)]
pub struct AuditExport {
    pub format: ExportFormat,
    pub generated_at: DateTime<Utc>,
    pub row_count: usize,
    pub body: Vec<u8>,
}

impl AuditExport {
    pub fn file_name(&self) -> String {
        format!(
            "audit-logs-{}.{}",
            self.generated_at.format("%Y%m%dT%H%M%SZ"),
            self.format.extension()
        )
    }
}

const CSV_HEADER: [&str; 18] = [
    "id",
    "sequence",
    "request_id",
    "timestamp",
    "actor_id",
    "actor_role",
    "actor_ip",
    "entity_type",
    "action",
    "account_id",
    "cw_entity_id",
    "success",
    "error_message",
    "before",
    "after",
    "hash",
    "prev_hash",
    "scope",
];

/// Render entries in the requested format
///
/// # Errors
///
/// Returns [`AuditError::Export`] if CSV writing fails and
/// [`AuditError::Serialization`] if JSON encoding fails.
pub fn render(entries: &[AuditLogEntry], format: ExportFormat) -> AuditResult<AuditExport> {
    let body = match format {
        ExportFormat::Csv => render_csv(entries)?,
        ExportFormat::Json => serde_json::to_vec_pretty(entries)?,
    };

    Ok(AuditExport {
        format,
        generated_at: Utc::now(),
        row_count: entries.len(),
        body,
    })
}

fn render_csv(entries: &[AuditLogEntry]) -> AuditResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| AuditError::Export(e.to_string()))?;

    for entry in entries {
        let record = [
            entry.id.to_string(),
            entry.sequence.to_string(),
            entry.request_id.clone(),
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            entry.actor_id.clone(),
            entry.actor_role.to_string(),
            entry.actor_ip.clone().unwrap_or_default(),
            entry.entity_type.to_string(),
            entry.action.to_string(),
            entry.account_id.map(|id| id.to_string()).unwrap_or_default(),
            entry.cw_entity_id.map(|id| id.to_string()).unwrap_or_default(),
            entry.success.to_string(),
            entry.error_message.clone().unwrap_or_default(),
            snapshot_cell(entry.before.as_ref())?,
            snapshot_cell(entry.after.as_ref())?,
            entry.hash.clone(),
            entry.prev_hash.clone(),
            crate::chain::ChainScope::of(entry).to_string(),
        ];
        writer
            .write_record(&record)
            .map_err(|e| AuditError::Export(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| AuditError::Export(e.to_string()))
}

fn snapshot_cell(snapshot: Option<&serde_json::Value>) -> AuditResult<String> {
    Ok(match snapshot {
        Some(value) => serde_json::to_string(value)?,
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ActorRole, AuditAction, EntityType};
    use serde_json::json;
    use uuid::Uuid;

    fn entry(sequence: u64) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            sequence,
            request_id: format!("req-{sequence}"),
            timestamp: Utc::now(),
            actor_id: "5".to_string(),
            actor_role: ActorRole::Administrator,
            actor_ip: Some("198.51.100.7".to_string()),
            entity_type: EntityType::Team,
            action: AuditAction::Create,
            account_id: Some(2),
            cw_entity_id: Some(40),
            before: None,
            after: Some(json!({"name": "Billing, Tier 2"})),
            success: true,
            error_message: None,
            hash: "a".repeat(64),
            prev_hash: "0".repeat(64),
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!(matches!(
            "xlsx".parse::<ExportFormat>(),
            Err(AuditError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let entries = vec![entry(1), entry(2)];
        let export = render(&entries, ExportFormat::Csv).unwrap();
        assert_eq!(export.row_count, 2);

        let mut reader = csv::Reader::from_reader(export.body.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), CSV_HEADER.len());
        assert_eq!(&headers[0], "id");

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], entries[0].id.to_string());
        assert_eq!(&rows[1][1], "2");
        assert_eq!(&rows[0][14], r#"{"name":"Billing, Tier 2"}"#);
        assert_eq!(&rows[0][13], "");
        assert_eq!(&rows[0][17], "account:2");
    }

    #[test]
    fn test_json_is_an_array_of_entries() {
        let entries = vec![entry(1)];
        let export = render(&entries, ExportFormat::Json).unwrap();
        let parsed: Vec<AuditLogEntry> = serde_json::from_slice(&export.body).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_file_name_uses_extension() {
        let export = render(&[], ExportFormat::Json).unwrap();
        let name = export.file_name();
        assert!(name.starts_with("audit-logs-"));
        assert!(name.ends_with(".json"));
        assert_eq!(export.row_count, 0);
    }
}
