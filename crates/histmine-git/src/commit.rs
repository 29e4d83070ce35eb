//! Conversion of git2 commits into backend revisions.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::Commit;
use histmine_core::{Revision, Signature};

/// Metadata of a git2 commit.
pub fn revision_from_commit(commit: &Commit) -> Revision {
    Revision {
        id: commit.id().to_string(),
        parents: commit.parent_ids().map(|id| id.to_string()).collect(),
        author: signature(&commit.author()),
        committer: signature(&commit.committer()),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
    }
}

/// Name, email and time with the offset the signature was recorded in.
fn signature(sig: &git2::Signature) -> Signature {
    let when = sig.when();
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    let utc: DateTime<Utc> = DateTime::from_timestamp(when.seconds(), 0).unwrap_or_default();

    Signature {
        name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        time: utc.with_timezone(&offset),
    }
}
