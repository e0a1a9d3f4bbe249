//! Case-to-issue synchronization
//!
//! One cycle: discover cases carrying the search tag, forward each one that
//! is not yet marked with the success tag to Gitea, then acknowledge it on
//! the case by swapping the tags (retrying once against a freshly fetched
//! version token when the first write-back fails).
//!
//! Cases are processed sequentially in search order and share no mutable
//! state; a failure on one case never affects another.
//!
//! Delivery is at-least-once. A case whose issue was created but whose
//! write-back never succeeded keeps the search tag and is forwarded again on
//! the next cycle.

use super::labels::{map_labels, SeverityTable};
use super::metrics;
use crate::config::RelayConfig;
use crate::integrations::{CaseSource, IssueSink};
use crate::model::{Case, CreatedIssue, IssueDraft, Label};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tag protocol and issue rendering inputs for the engine
#[derive(Debug, Clone)]
pub struct SyncRules {
    pub search_tag: String,
    pub success_tag: String,
    /// Base URL used for case deep links
    pub kibana_url: String,
    pub severities: SeverityTable,
}

impl SyncRules {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            search_tag: config.sync.search_tag.clone(),
            success_tag: config.sync.success_tag.clone(),
            kibana_url: config.kibana.url.trim_end_matches('/').to_string(),
            severities: SeverityTable::from(&config.sync.severity_labels),
        }
    }
}

/// Terminal state of one case within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOutcome {
    /// Issue created and acknowledged on the first write-back
    Created,
    /// Case already carries the success tag
    SkippedAlreadySynced,
    /// Issue creation failed; the case is picked up again next cycle
    CreateFailed,
    /// Write-back failed and the case could not be re-fetched for a retry
    WritebackFailed,
    /// Write-back succeeded on the retry with a fresh version token
    WritebackRetriedOk,
    /// Both write-back attempts failed
    WritebackRetriedFailed,
}

impl SyncOutcome {
    pub const ALL: [SyncOutcome; 6] = [
        SyncOutcome::Created,
        SyncOutcome::SkippedAlreadySynced,
        SyncOutcome::CreateFailed,
        SyncOutcome::WritebackFailed,
        SyncOutcome::WritebackRetriedOk,
        SyncOutcome::WritebackRetriedFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Created => "created",
            SyncOutcome::SkippedAlreadySynced => "skipped_already_synced",
            SyncOutcome::CreateFailed => "create_failed",
            SyncOutcome::WritebackFailed => "writeback_failed",
            SyncOutcome::WritebackRetriedOk => "writeback_retried_ok",
            SyncOutcome::WritebackRetriedFailed => "writeback_retried_failed",
        }
    }

    /// Whether an issue exists for the case after this outcome
    pub fn issue_created(&self) -> bool {
        !matches!(
            self,
            SyncOutcome::SkippedAlreadySynced | SyncOutcome::CreateFailed
        )
    }

    /// Whether the case was left carrying the success tag
    pub fn acknowledged(&self) -> bool {
        matches!(
            self,
            SyncOutcome::Created | SyncOutcome::WritebackRetriedOk
        )
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-case result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub case_id: String,
    pub title: String,
    pub outcome: SyncOutcome,
    pub issue_url: Option<String>,
}

/// Result of one full cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: Vec<CaseReport>,
}

impl CycleReport {
    /// Number of cases that ended in `outcome`
    pub fn count(&self, outcome: SyncOutcome) -> usize {
        self.cases.iter().filter(|c| c.outcome == outcome).count()
    }

    pub fn issues_created(&self) -> usize {
        self.cases.iter().filter(|c| c.outcome.issue_created()).count()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Drives discovery, creation and acknowledgement for one cycle at a time
pub struct SyncEngine<C, I> {
    cases: Arc<C>,
    issues: Arc<I>,
    rules: SyncRules,
}

impl<C: CaseSource, I: IssueSink> SyncEngine<C, I> {
    pub fn new(cases: Arc<C>, issues: Arc<I>, rules: SyncRules) -> Self {
        Self {
            cases,
            issues,
            rules,
        }
    }

    pub fn rules(&self) -> &SyncRules {
        &self.rules
    }

    pub fn case_source(&self) -> &C {
        &self.cases
    }

    pub fn issue_sink(&self) -> &I {
        &self.issues
    }

    /// Run one full cycle over every case currently carrying the search tag
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        let found = self.cases.find_by_tag(&self.rules.search_tag).await;

        debug!(
            tag = %self.rules.search_tag,
            found = found.len(),
            "Discovered tagged cases"
        );

        // Labels are fetched once per cycle, and only when something will be forwarded
        let needs_labels = found.iter().any(|c| !c.has_tag(&self.rules.success_tag));
        let org_labels = if needs_labels {
            self.issues.list_org_labels().await
        } else {
            Vec::new()
        };

        let mut reports = Vec::with_capacity(found.len());
        for case in &found {
            let report = self.process_case(case, &org_labels).await;
            metrics::record_case(report.outcome.as_str());
            reports.push(report);
        }

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            cases: reports,
        };

        info!(
            found = report.cases.len(),
            created = report.count(SyncOutcome::Created),
            retried_ok = report.count(SyncOutcome::WritebackRetriedOk),
            skipped = report.count(SyncOutcome::SkippedAlreadySynced),
            create_failed = report.count(SyncOutcome::CreateFailed),
            writeback_failed = report.count(SyncOutcome::WritebackFailed)
                + report.count(SyncOutcome::WritebackRetriedFailed),
            duration_secs = report.duration_secs(),
            "Sync cycle complete"
        );

        report
    }

    /// Forward and acknowledge a single case
    pub async fn process_case(&self, case: &Case, org_labels: &[Label]) -> CaseReport {
        let report = |outcome: SyncOutcome, issue_url: Option<String>| CaseReport {
            case_id: case.id.clone(),
            title: case.title.clone(),
            outcome,
            issue_url,
        };

        if case.has_tag(&self.rules.success_tag) {
            info!(
                case_id = %case.id,
                success_tag = %self.rules.success_tag,
                "Case already forwarded, skipping"
            );
            return report(SyncOutcome::SkippedAlreadySynced, None);
        }

        let labels = map_labels(
            &case.tags,
            case.severity,
            org_labels,
            &self.rules.severities,
        );
        let draft = IssueDraft::from_case(case, &self.rules.kibana_url, labels);

        let Some(issue) = self.issues.create_issue(&draft).await else {
            warn!(
                case_id = %case.id,
                title = %case.title,
                "Issue creation failed; case stays tagged for the next cycle"
            );
            return report(SyncOutcome::CreateFailed, None);
        };

        let outcome = self.acknowledge(case, &issue).await;
        report(outcome, Some(issue.html_url))
    }

    /// Swap the tags on the case, retrying once with a fresh snapshot
    async fn acknowledge(&self, case: &Case, issue: &CreatedIssue) -> SyncOutcome {
        let (search, success) = (&self.rules.search_tag, &self.rules.success_tag);

        if self.cases.update_tags_and_status(case, search, success).await {
            self.comment(&case.id, issue).await;
            return SyncOutcome::Created;
        }

        warn!(
            case_id = %case.id,
            version = %case.version,
            "Write-back failed, refreshing case for one retry"
        );

        let Some(fresh) = self.cases.get(&case.id).await else {
            error!(
                case_id = %case.id,
                issue_url = %issue.html_url,
                "Could not refresh case after failed write-back; it will be forwarded again"
            );
            return SyncOutcome::WritebackFailed;
        };

        if self.cases.update_tags_and_status(&fresh, search, success).await {
            info!(case_id = %case.id, version = %fresh.version, "Write-back succeeded on retry");
            self.comment(&case.id, issue).await;
            SyncOutcome::WritebackRetriedOk
        } else {
            error!(
                case_id = %case.id,
                issue_url = %issue.html_url,
                "Write-back retry failed; case keeps the search tag and will be forwarded again"
            );
            SyncOutcome::WritebackRetriedFailed
        }
    }

    async fn comment(&self, case_id: &str, issue: &CreatedIssue) {
        let text = format!("Forwarded to Gitea: {}", issue.html_url);
        if !self.cases.add_comment(case_id, &text).await {
            debug!(case_id = %case_id, "Issue link comment was not posted");
        }
    }
}
