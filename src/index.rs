use std::collections::HashMap;

use crate::issue::{MirrorIssue, SourceIssue};
use crate::render::mirror_title;

/// Finds the mirror counterpart of a source issue, if one has been created.
pub(crate) trait MirrorIndex {
    fn find(&self, issue: &SourceIssue) -> Option<&MirrorIssue>;
}

/// Correlates issues through their derived mirror title.
///
/// When several mirror issues share a title the one listed last wins.
#[derive(Debug, Default)]
pub(crate) struct TitleIndex {
    by_title: HashMap<String, MirrorIssue>,
}

impl TitleIndex {
    pub(crate) fn build(mirror_issues: impl IntoIterator<Item = MirrorIssue>) -> TitleIndex {
        let by_title = mirror_issues
            .into_iter()
            .map(|issue| (issue.title.clone(), issue))
            .collect();
        TitleIndex { by_title }
    }

    pub(crate) fn get(&self, title: &str) -> Option<&MirrorIssue> {
        self.by_title.get(title)
    }

    pub(crate) fn len(&self) -> usize {
        self.by_title.len()
    }
}

impl MirrorIndex for TitleIndex {
    fn find(&self, issue: &SourceIssue) -> Option<&MirrorIssue> {
        self.get(&mirror_title(issue.number, &issue.title))
    }
}
