use std::fmt;

use tracing::{debug, warn};

use crate::index::MirrorIndex;
use crate::issue::{MirrorIssue, SourceIssue};
use crate::render::{self, mirror_title, Renderer};

/// A source issue rendered and ready to be filed on the mirror.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PlannedIssue {
    pub source_number: u64,
    pub title: String,
    pub body: String,
    pub comments: Vec<String>,
}

/// Rendered comments still missing from an existing mirror issue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CommentDiff {
    pub target_issue_id: String,
    pub mirror_number: u64,
    pub source_number: u64,
    pub pending: Vec<String>,
}

/// Everything needed to bring the mirror up to date, in source issue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SyncPlan {
    pub mirror_repository_id: String,
    pub to_create: Vec<PlannedIssue>,
    pub comments_to_add: Vec<CommentDiff>,
}

impl SyncPlan {
    pub(crate) fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.comments_to_add.is_empty()
    }

    /// Number of mutations applying the plan takes.
    pub(crate) fn action_count(&self) -> u64 {
        let creations = self
            .to_create
            .iter()
            .map(|issue| 1 + issue.comments.len())
            .sum::<usize>();
        let catch_ups = self
            .comments_to_add
            .iter()
            .map(|diff| diff.pending.len())
            .sum::<usize>();
        (creations + catch_ups) as u64
    }
}

impl fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Mirror is up to date");
        }
        for issue in &self.to_create {
            writeln!(
                f,
                "Would create \"{}\" with {} comment(s)",
                issue.title,
                issue.comments.len()
            )?;
        }
        for diff in &self.comments_to_add {
            writeln!(
                f,
                "Would add {} comment(s) to mirror issue #{} (source #{})",
                diff.pending.len(),
                diff.mirror_number,
                diff.source_number
            )?;
        }
        Ok(())
    }
}

pub(crate) fn plan_issue(
    renderer: &Renderer,
    issue: &SourceIssue,
) -> Result<PlannedIssue, render::Error> {
    Ok(PlannedIssue {
        source_number: issue.number,
        title: mirror_title(issue.number, &issue.title),
        body: renderer.render(&issue.content)?,
        comments: issue
            .comments
            .iter()
            .map(|c| renderer.render(c))
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Works out which source comments `mirror` is still missing.
///
/// Comments on the mirror written by `bot_login` are taken to be the leading
/// source comments, in order. This only holds while source comments are never
/// edited or deleted once mirrored: a deleted source comment shifts the
/// alignment and the suffix computed here will skip or repeat comments.
pub(crate) fn reconcile_comments(
    renderer: &Renderer,
    mirror: &MirrorIssue,
    source: &SourceIssue,
    bot_login: &str,
) -> Result<Option<CommentDiff>, render::Error> {
    let applied = mirror.comments_by(bot_login).count();
    let expected = source.comments.len();
    if applied >= expected {
        if applied > expected {
            warn!(
                source = source.number,
                mirror = mirror.number,
                applied,
                expected,
                "mirror has more bot comments than the source issue"
            );
        }
        return Ok(None);
    }
    let pending = source.comments[applied..]
        .iter()
        .map(|c| renderer.render(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(CommentDiff {
        target_issue_id: mirror.id.clone(),
        mirror_number: mirror.number,
        source_number: source.number,
        pending,
    }))
}

/// Splits source issues into those lacking a mirror and those whose mirror
/// lacks trailing comments.
pub(crate) fn diff<X: MirrorIndex + ?Sized>(
    renderer: &Renderer,
    sources: &[SourceIssue],
    index: &X,
    mirror_repository_id: String,
    bot_login: &str,
) -> Result<SyncPlan, render::Error> {
    let mut plan = SyncPlan {
        mirror_repository_id,
        to_create: Vec::new(),
        comments_to_add: Vec::new(),
    };
    for source in sources {
        match index.find(source) {
            Some(mirror) => {
                if let Some(diff) = reconcile_comments(renderer, mirror, source, bot_login)? {
                    debug!(
                        source = source.number,
                        mirror = mirror.number,
                        pending = diff.pending.len(),
                        "mirror issue is missing comments"
                    );
                    plan.comments_to_add.push(diff);
                }
            }
            None => plan.to_create.push(plan_issue(renderer, source)?),
        }
    }
    Ok(plan)
}
