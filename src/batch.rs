use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::AdvisorService;
use crate::models::{RecommendationResult, StudentInput, Submission};
use crate::report;
use crate::session::{Advisor, FlowError};

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub row: usize,
    pub status: &'static str,
    pub submission_id: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub recommended_stream: Option<String>,
    pub confidence_score: Option<u32>,
    pub report: Option<String>,
    pub detail: String,
}

impl BatchOutcome {
    fn failed(row: usize, location: Option<String>, detail: String) -> Self {
        Self {
            row,
            status: "failed",
            submission_id: None,
            submitted_at: None,
            location,
            recommended_stream: None,
            confidence_score: None,
            report: None,
            detail,
        }
    }
}

/// Writes one student's report. A write failure marks the row failed
/// instead of ending the batch.
fn write_report(
    out_dir: &Path,
    row: usize,
    location: Option<String>,
    submission: &Submission,
    result: RecommendationResult,
) -> BatchOutcome {
    let file_name = format!("{row:03}-{}.md", submission.id);
    let body = report::build_recommendation_report(Some(submission), &result, Utc::now());
    let written = std::fs::write(out_dir.join(&file_name), body);

    let (status, report, detail) = match written {
        Ok(()) => ("ok", Some(file_name), String::new()),
        Err(err) => {
            warn!(row, error = %err, "failed to write report");
            ("failed", None, format!("report not written: {err}"))
        }
    };

    BatchOutcome {
        row,
        status,
        submission_id: Some(submission.id),
        submitted_at: Some(submission.submitted_at),
        location,
        recommended_stream: Some(result.recommended_stream),
        confidence_score: Some(result.confidence_score),
        report,
        detail,
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<BatchOutcome>,
    pub summary_path: PathBuf,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status == "ok").count()
    }
}

/// Submits one assessment per CSV row, in file order. Rows are
/// range-checked since nothing clamped them on the way in; a bad row
/// is recorded and skipped.
pub async fn run_batch<S: AdvisorService>(
    advisor: &Advisor<S>,
    csv_path: &Path,
    out_dir: &Path,
) -> anyhow::Result<BatchSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut outcomes = Vec::new();

    for (index, record) in reader.deserialize::<StudentInput>().enumerate() {
        let row = index + 1;
        let input = match record {
            Ok(input) => input,
            Err(err) => {
                warn!(row, error = %err, "skipping unreadable row");
                outcomes.push(BatchOutcome::failed(row, None, err.to_string()));
                continue;
            }
        };
        let location = Some(input.location.clone());

        match advisor.submit_assessment_strict(input).await {
            Ok(nav) => {
                let (Some(submission), Some(result)) = (nav.submission, nav.result) else {
                    outcomes.push(BatchOutcome::failed(row, location, "empty response".to_string()));
                    continue;
                };
                outcomes.push(write_report(out_dir, row, location, &submission, result));
            }
            Err(err) => {
                let detail = match &err {
                    FlowError::Service(service) => {
                        format!("{} ({service})", service.user_message())
                    }
                    other => other.to_string(),
                };
                warn!(row, error = %err, "assessment failed");
                outcomes.push(BatchOutcome::failed(row, location, detail));
            }
        }
    }

    let summary_path = out_dir.join("summary.csv");
    let mut writer = csv::Writer::from_path(&summary_path)
        .with_context(|| format!("failed to create {}", summary_path.display()))?;
    for outcome in &outcomes {
        writer.serialize(outcome)?;
    }
    writer.flush()?;

    info!(
        rows = outcomes.len(),
        summary = %summary_path.display(),
        "batch complete"
    );

    Ok(BatchSummary {
        outcomes,
        summary_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{pcm_result, FakeService};

    const HEADER: &str = "math,science,english,logical,creativity,scientific_interest,communication,leadership,stress_level,risk_level,budget,location,education_level";

    fn write_csv(dir: &Path, rows: &[&str]) -> PathBuf {
        let path = dir.join("students.csv");
        let mut body = String::from(HEADER);
        for row in rows {
            body.push('\n');
            body.push_str(row);
        }
        body.push('\n');
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn writes_reports_and_summary_for_each_row() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = write_csv(
            dir.path(),
            &[
                "80,75,60,70,50,65,55,45,4,6,500000,Mumbai,class_12",
                "50,50,50,50,50,50,50,50,5,5,300000,,class_10",
                "50,150,50,50,50,50,50,50,5,5,300000,Pune,class_10",
                "not,a,number,row,,,,,,,,,",
                "90,85,70,80,60,75,65,55,3,7,800000,Delhi,class_10",
            ],
        );
        let out_dir = dir.path().join("reports");
        let advisor = Advisor::new(FakeService {
            recommendation: Some(pcm_result()),
            ..FakeService::default()
        });

        let summary = run_batch(&advisor, &csv_path, &out_dir).await.unwrap();
        let statuses: Vec<_> = summary.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec!["ok", "failed", "failed", "failed", "ok"]);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.outcomes[1].detail, "location is required");
        assert_eq!(summary.outcomes[2].detail, "science is out of range");

        let report_name = summary.outcomes[0].report.clone().unwrap();
        let body = std::fs::read_to_string(out_dir.join(report_name)).unwrap();
        assert!(body.contains("Recommended: **Science (PCM)**"));

        let mut reader = csv::Reader::from_path(&summary.summary_path).unwrap();
        assert_eq!(reader.records().count(), 5);
    }

    #[tokio::test]
    async fn service_failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = write_csv(
            dir.path(),
            &[
                "80,75,60,70,50,65,55,45,4,6,500000,Mumbai,class_12",
                "90,85,70,80,60,75,65,55,3,7,800000,Delhi,class_10",
            ],
        );
        let advisor = Advisor::new(FakeService::default());

        let summary = run_batch(&advisor, &csv_path, &dir.path().join("out"))
            .await
            .unwrap();
        assert_eq!(summary.succeeded(), 0);
        assert_eq!(summary.outcomes.len(), 2);
        assert!(summary.outcomes[0]
            .detail
            .starts_with("Could not reach the recommendation service."));
    }

    #[test]
    fn unwritable_report_marks_the_row_failed() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("blocker");
        std::fs::write(&not_a_dir, "").unwrap();
        let submission = Submission::new(StudentInput {
            location: "Mumbai".to_string(),
            ..StudentInput::default()
        });

        let outcome = write_report(
            &not_a_dir,
            3,
            Some("Mumbai".to_string()),
            &submission,
            pcm_result(),
        );
        assert_eq!(outcome.status, "failed");
        assert_eq!(outcome.report, None);
        assert_eq!(outcome.submission_id, Some(submission.id));
        assert!(outcome.detail.starts_with("report not written:"));

        let outcome = write_report(dir.path(), 4, None, &submission, pcm_result());
        assert_eq!(outcome.status, "ok");
        assert!(dir.path().join(outcome.report.unwrap()).exists());
    }

    #[tokio::test]
    async fn missing_csv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let advisor = Advisor::new(FakeService::default());
        let result = run_batch(&advisor, &dir.path().join("nope.csv"), dir.path()).await;
        assert!(result.is_err());
    }
}
