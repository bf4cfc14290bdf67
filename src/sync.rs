use thiserror::Error;
use tracing::{debug, info};

use crate::{
    graphql::{self, GraphqlClient},
    index::TitleIndex,
    issue::{MirrorIssue, Repository, SourceIssue},
    progress::Progress,
    reconcile::{self, SyncPlan},
    render::{self, Renderer},
    RepoName,
};

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Graphql(#[from] graphql::Error),
    #[error(transparent)]
    Render(#[from] render::Error),
    #[error("interrupted")]
    Interrupted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SyncReport {
    pub issues_created: usize,
    pub comments_added: usize,
}

/// One-way mirror of issues from the tracker behind `source` into the
/// tracker behind `target`.
pub(crate) struct Mirror<S, T> {
    source: S,
    target: T,
    renderer: Renderer,
}

impl<S: GraphqlClient, T: GraphqlClient> Mirror<S, T> {
    pub(crate) fn new(source: S, target: T) -> Result<Mirror<S, T>, Error> {
        Ok(Mirror {
            source,
            target,
            renderer: Renderer::new()?,
        })
    }

    /// Reads both repositories and works out what the mirror is missing.
    pub(crate) async fn plan(&self, from: &RepoName, to: &RepoName) -> Result<SyncPlan, Error> {
        let source: Repository<SourceIssue> =
            graphql::fetch_repository(&self.source, from).await?;
        info!(repo = %from, issues = source.issues.len(), "fetched source issues");
        let mirror: Repository<MirrorIssue> =
            graphql::fetch_repository(&self.target, to).await?;
        info!(repo = %to, issues = mirror.issues.len(), "fetched mirror issues");
        let bot_login = graphql::viewer_login(&self.target).await?;
        debug!(%bot_login, "resolved mirror identity");

        let index = TitleIndex::build(mirror.issues);
        debug!(titles = index.len(), "indexed mirror issues");
        let plan =
            reconcile::diff(&self.renderer, &source.issues, &index, mirror.id, &bot_login)?;
        info!(
            to_create = plan.to_create.len(),
            catch_up = plan.comments_to_add.len(),
            "computed sync plan"
        );
        Ok(plan)
    }

    /// Creates missing issues, each followed by its comments, then appends
    /// catch-up comments. Stops at the first failed mutation; whatever was
    /// created before it stays.
    pub(crate) async fn apply<P: Progress + ?Sized>(
        &self,
        plan: SyncPlan,
        progress: &P,
    ) -> Result<SyncReport, Error> {
        let mut report = SyncReport::default();
        for issue in plan.to_create {
            let created = graphql::create_issue(
                &self.target,
                &plan.mirror_repository_id,
                &issue.title,
                &issue.body,
            )
            .await?;
            report.issues_created += 1;
            info!(source = issue.source_number, mirror = created.number, "created mirror issue");
            progress.report(&format!(
                "Created mirror issue #{} -> #{}",
                issue.source_number, created.number
            ));
            let total = issue.comments.len();
            for (i, body) in issue.comments.iter().enumerate() {
                graphql::add_comment(&self.target, &created.id, body).await?;
                report.comments_added += 1;
                progress.report(&format!(
                    "Added comment {}/{} to mirror issue #{}",
                    i + 1,
                    total,
                    created.number
                ));
            }
        }
        for diff in plan.comments_to_add {
            let total = diff.pending.len();
            for (i, body) in diff.pending.iter().enumerate() {
                graphql::add_comment(&self.target, &diff.target_issue_id, body).await?;
                report.comments_added += 1;
                progress.report(&format!(
                    "Caught up comment {}/{} on mirror issue #{} (source #{})",
                    i + 1,
                    total,
                    diff.mirror_number,
                    diff.source_number
                ));
            }
            info!(
                source = diff.source_number,
                mirror = diff.mirror_number,
                added = total,
                "caught up comments"
            );
        }
        Ok(report)
    }
}
