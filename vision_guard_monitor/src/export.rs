//! Downtime report export

use crate::errors::{MonitorError, Result};
use crate::transport::DashboardApi;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{error, info, instrument};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const EXPORT_FAILED_MSG: &str = "เกิดข้อผิดพลาดในการ export รายงาน";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportScope {
    Daily,
    Monthly,
    Yearly,
}

impl std::fmt::Display for ReportScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportScope::Daily => write!(f, "daily"),
            ReportScope::Monthly => write!(f, "monthly"),
            ReportScope::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for ReportScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(ReportScope::Daily),
            "monthly" => Ok(ReportScope::Monthly),
            "yearly" => Ok(ReportScope::Yearly),
            other => Err(format!("unknown report type '{}'", other)),
        }
    }
}

/// A report scope plus the date selection it needs.
///
/// Month and day are only meaningful for the scopes that use them and are
/// ignored otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRequest {
    pub scope: ReportScope,
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl ExportRequest {
    pub fn daily(year: i32, month: u32, day: u32) -> Self {
        Self {
            scope: ReportScope::Daily,
            year,
            month: Some(month),
            day: Some(day),
        }
    }

    pub fn monthly(year: i32, month: u32) -> Self {
        Self {
            scope: ReportScope::Monthly,
            year,
            month: Some(month),
            day: None,
        }
    }

    pub fn yearly(year: i32) -> Self {
        Self {
            scope: ReportScope::Yearly,
            year,
            month: None,
            day: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.scope {
            ReportScope::Daily => {
                let (month, day) = match (self.month, self.day) {
                    (Some(month), Some(day)) => (month, day),
                    _ => {
                        return Err(MonitorError::Rejected(
                            "daily report requires month and day".to_string(),
                        ));
                    }
                };
                if NaiveDate::from_ymd_opt(self.year, month, day).is_none() {
                    return Err(MonitorError::Rejected(format!(
                        "{}-{:02}-{:02} is not a valid date",
                        self.year, month, day
                    )));
                }
            }
            ReportScope::Monthly => match self.month {
                Some(month) if (1..=12).contains(&month) => {}
                Some(month) => {
                    return Err(MonitorError::Rejected(format!(
                        "month {} is out of range",
                        month
                    )));
                }
                None => {
                    return Err(MonitorError::Rejected(
                        "monthly report requires month".to_string(),
                    ));
                }
            },
            ReportScope::Yearly => {}
        }
        Ok(())
    }

    /// Query string pairs for `GET /downtime/export`
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("report_type", self.scope.to_string()),
            ("year", self.year.to_string()),
        ];

        if matches!(self.scope, ReportScope::Daily | ReportScope::Monthly) {
            if let Some(month) = self.month {
                pairs.push(("month", month.to_string()));
            }
        }

        if self.scope == ReportScope::Daily {
            if let Some(day) = self.day {
                pairs.push(("day", day.to_string()));
            }
        }

        pairs
    }

    pub fn filename(&self) -> String {
        let m = self.month.unwrap_or(1);
        let d = self.day.unwrap_or(1);
        match self.scope {
            ReportScope::Daily => format!("Daily_Report_{}-{:02}-{:02}.xlsx", self.year, m, d),
            ReportScope::Monthly => format!("Monthly_Report_{}-{:02}.xlsx", self.year, m),
            ReportScope::Yearly => format!("Yearly_Report_{}.xlsx", self.year),
        }
    }
}

/// Fetch a report and write it into `dir`. No retry on failure.
#[instrument(skip(api), fields(scope = %request.scope))]
pub async fn save_report(
    api: &dyn DashboardApi,
    request: &ExportRequest,
    dir: &Path,
) -> Result<PathBuf> {
    request.validate()?;

    let outcome = async {
        let bytes = api.export_report(request).await?;
        let path = dir.join(request.filename());
        tokio::fs::write(&path, &bytes).await?;
        Ok::<_, MonitorError>((path, bytes.len()))
    }
    .await;

    match outcome {
        Ok((path, size)) => {
            info!("Saved report to {} ({} bytes)", path.display(), size);
            Ok(path)
        }
        Err(e) => {
            error!("Export error: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Failure};

    #[test]
    fn test_filenames() {
        assert_eq!(
            ExportRequest::daily(2025, 3, 7).filename(),
            "Daily_Report_2025-03-07.xlsx"
        );
        assert_eq!(
            ExportRequest::monthly(2025, 11).filename(),
            "Monthly_Report_2025-11.xlsx"
        );
        assert_eq!(ExportRequest::yearly(2025).filename(), "Yearly_Report_2025.xlsx");
    }

    #[test]
    fn test_query_pairs_follow_scope() {
        let pairs = ExportRequest::daily(2025, 3, 7).query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("report_type", "daily".to_string()),
                ("year", "2025".to_string()),
                ("month", "3".to_string()),
                ("day", "7".to_string()),
            ]
        );

        let mut yearly = ExportRequest::yearly(2024);
        yearly.month = Some(5);
        yearly.day = Some(9);
        assert_eq!(
            yearly.query_pairs(),
            vec![
                ("report_type", "yearly".to_string()),
                ("year", "2024".to_string()),
            ]
        );

        let mut monthly = ExportRequest::monthly(2024, 2);
        monthly.day = Some(30);
        assert_eq!(monthly.query_pairs().len(), 3);
    }

    #[test]
    fn test_validation() {
        assert!(ExportRequest::daily(2025, 2, 29).validate().is_err());
        assert!(ExportRequest::daily(2024, 2, 29).validate().is_ok());
        assert!(ExportRequest::monthly(2025, 13).validate().is_err());
        assert!(ExportRequest::yearly(2025).validate().is_ok());

        let incomplete = ExportRequest {
            scope: ReportScope::Daily,
            year: 2025,
            month: Some(3),
            day: None,
        };
        assert!(incomplete.validate().is_err());
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("Daily".parse::<ReportScope>(), Ok(ReportScope::Daily));
        assert_eq!("yearly".parse::<ReportScope>(), Ok(ReportScope::Yearly));
        assert!("weekly".parse::<ReportScope>().is_err());
    }

    #[tokio::test]
    async fn test_save_report_writes_payload() {
        let api = FakeApi::new();
        api.set_report(b"xlsx-bytes".to_vec());
        let dir = tempfile::tempdir().unwrap();

        let path = save_report(&api, &ExportRequest::monthly(2025, 3), dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("Monthly_Report_2025-03.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"xlsx-bytes");
        assert_eq!(api.export_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_export_is_not_retried() {
        let api = FakeApi::new();
        api.fail_export(Failure::Status(500, None));
        let dir = tempfile::tempdir().unwrap();

        let err = save_report(&api, &ExportRequest::yearly(2025), dir.path())
            .await
            .unwrap_err();

        assert_eq!(err.user_message(EXPORT_FAILED_MSG), EXPORT_FAILED_MSG);
        assert_eq!(api.export_calls(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_sends_nothing() {
        let api = FakeApi::new();
        let dir = tempfile::tempdir().unwrap();

        let err = save_report(&api, &ExportRequest::daily(2025, 2, 30), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::Rejected(_)));
        assert_eq!(api.export_calls(), 0);
    }
}
