//! Domain types shared by the adapters and the sync engine
//!
//! - **Case**: snapshot of a Kibana Security case
//! - **Label**: Gitea organization label
//! - **IssueDraft** / **CreatedIssue**: the write-once issue forwarded for a case

mod case;
mod issue;

pub use case::{tag_casings, tags_equal, Case, CaseCreator, Severity, UNKNOWN_CREATOR};
pub use issue::{render_body, CreatedIssue, IssueDraft, Label};
