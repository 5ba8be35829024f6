use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// What goes into the markdown copy of a saved impact report.
pub struct SnapshotInput<'a> {
    pub report_id: Uuid,
    pub project_name: &'a str,
    pub participant_name: Option<&'a str>,
    pub overall_improvement: Option<f64>,
    pub recommendations: Option<&'a str>,
    pub report_data: &'a Value,
    pub created_at: DateTime<Utc>,
}

pub fn snapshot_key(project_id: Uuid, report_id: Uuid) -> String {
    format!("reports/{project_id}/{report_id}.md")
}

/// Renders a saved report as a markdown document.
pub fn render_report_md(input: &SnapshotInput<'_>) -> String {
    let mut md = format!("# Impact Report: {}\n\n", input.project_name);
    md.push_str(&format!("- **Report:** {}\n", input.report_id));
    md.push_str(&format!(
        "- **Scope:** {}\n",
        input.participant_name.unwrap_or("Whole cohort")
    ));
    md.push_str(&format!("- **Generated:** {}\n", input.created_at.to_rfc3339()));
    match input.overall_improvement {
        Some(pct) => md.push_str(&format!("- **Overall improvement:** {pct}%\n")),
        None => md.push_str("- **Overall improvement:** n/a\n"),
    }
    md.push('\n');

    if let Some(text) = input.recommendations.filter(|t| !t.trim().is_empty()) {
        md.push_str("## Recommendations\n\n");
        md.push_str(text.trim());
        md.push_str("\n\n");
    }

    let data = serde_json::to_string_pretty(input.report_data).unwrap_or_else(|_| input.report_data.to_string());
    md.push_str("## Report Data\n\n```json\n");
    md.push_str(&data);
    md.push_str("\n```\n");
    md
}

pub async fn upload_snapshot(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    markdown: String,
) -> Result<(), AppError> {
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(markdown.into_bytes()))
        .content_type("text/markdown")
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

    info!("Uploaded report snapshot to s3://{}/{}", bucket, key);
    Ok(())
}

pub async fn fetch_snapshot(s3: &aws_sdk_s3::Client, bucket: &str, key: &str) -> Result<String, AppError> {
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 download failed: {e}")))?;
    let bytes = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::Storage(format!("S3 read failed: {e}")))?
        .into_bytes();
    String::from_utf8(bytes.to_vec()).map_err(|e| AppError::Storage(format!("Snapshot is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(data: &Value) -> SnapshotInput<'_> {
        SnapshotInput {
            report_id: Uuid::nil(),
            project_name: "KEMSA Lot Release 2024",
            participant_name: None,
            overall_improvement: Some(12.5),
            recommendations: Some("  Prioritise GMP refresher.  "),
            report_data: data,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_key_layout() {
        let (p, r) = (Uuid::nil(), Uuid::nil());
        assert_eq!(snapshot_key(p, r), format!("reports/{p}/{r}.md"));
    }

    #[test]
    fn test_render_sections() {
        let data = json!({ "overall_improvement": 12.5 });
        let md = render_report_md(&input(&data));
        assert!(md.starts_with("# Impact Report: KEMSA Lot Release 2024\n"));
        assert!(md.contains("- **Scope:** Whole cohort\n"));
        assert!(md.contains("- **Overall improvement:** 12.5%\n"));
        assert!(md.contains("## Recommendations\n\nPrioritise GMP refresher.\n"));
        assert!(md.contains("\"overall_improvement\": 12.5"));
    }

    #[test]
    fn test_render_skips_blank_recommendations() {
        let data = json!({});
        let mut inp = input(&data);
        inp.recommendations = Some("   ");
        inp.overall_improvement = None;
        inp.participant_name = Some("Jane Mwangi");
        let md = render_report_md(&inp);
        assert!(!md.contains("## Recommendations"));
        assert!(md.contains("n/a"));
        assert!(md.contains("Jane Mwangi"));
    }
}
