use chrono::{DateTime, Utc};

/// The account an issue or comment was written by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Author {
    pub login: String,
    pub url: String,
    pub avatar_url: String,
}

impl Author {
    /// Stand-in for accounts that have been deleted upstream.
    pub(crate) fn ghost() -> Author {
        Author {
            login: "ghost".to_string(),
            url: "https://github.com/ghost".to_string(),
            avatar_url: "https://avatars.githubusercontent.com/u/10137?v=4".to_string(),
        }
    }
}

/// An issue body or a comment, with enough context to attribute it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ContentItem {
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub author: Author,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SourceIssue {
    pub number: u64,
    pub title: String,
    pub content: ContentItem,
    pub comments: Vec<ContentItem>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MirrorComment {
    /// `None` when the author account no longer exists.
    pub author_login: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MirrorIssue {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub comments: Vec<MirrorComment>,
}

impl MirrorIssue {
    pub(crate) fn comments_by<'a>(
        &'a self,
        login: &'a str,
    ) -> impl Iterator<Item = &'a MirrorComment> + 'a {
        self.comments
            .iter()
            .filter(move |c| c.author_login.as_deref() == Some(login))
    }
}

/// A repository as fetched at the start of a run.
#[derive(Debug)]
pub(crate) struct Repository<I> {
    pub id: String,
    pub issues: Vec<I>,
}
