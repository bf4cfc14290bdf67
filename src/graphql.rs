use async_trait::async_trait;
use futures::TryStreamExt;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use octocrab::{service::middleware::retry::RetryConfig, Octocrab};

use crate::{
    issue::{Author, ContentItem, MirrorComment, MirrorIssue, Repository, SourceIssue},
    RepoName,
};

pub(crate) static ISSUES_QUERY: &str = include_str!("./get_issues.graphql");
pub(crate) static ISSUE_COMMENTS_QUERY: &str = include_str!("./get_issue_comments.graphql");
pub(crate) static VIEWER_LOGIN_QUERY: &str = include_str!("./viewer_login.graphql");
pub(crate) static CREATE_ISSUE_MUTATION: &str = include_str!("./create_issue.graphql");
pub(crate) static ADD_COMMENT_MUTATION: &str = include_str!("./add_comment.graphql");

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlAuthor {
    login: String,
    url: String,
    avatar_url: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl PageInfo {
    fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlIssues {
    nodes: Vec<GraphqlIssue>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphqlIssue {
    id: String,
    number: u64,
    title: String,
    body: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    url: String,
    author: Option<GraphqlAuthor>,
    comments: GraphqlComments,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlComments {
    nodes: Vec<GraphqlComment>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlComment {
    body: String,
    created_at: chrono::DateTime<chrono::Utc>,
    url: String,
    author: Option<GraphqlAuthor>,
}

#[derive(Debug, Deserialize)]
struct GraphqlIssuesRepositoryWrapper {
    repository: Option<GraphqlIssuesPage>,
}

#[derive(Debug, Deserialize)]
struct GraphqlIssuesPage {
    id: String,
    issues: GraphqlIssues,
}

#[derive(Debug, Deserialize)]
struct GraphqlCommentsRepositoryWrapper {
    repository: Option<GraphqlCommentsIssueWrapper>,
}

#[derive(Debug, Deserialize)]
struct GraphqlCommentsIssueWrapper {
    issue: Option<GraphqlIssueComments>,
}

#[derive(Debug, Deserialize)]
struct GraphqlIssueComments {
    comments: GraphqlComments,
}

#[derive(Debug, Deserialize)]
struct ViewerWrapper {
    viewer: GraphqlViewer,
}

#[derive(Debug, Deserialize)]
struct GraphqlViewer {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIssueWrapper {
    create_issue: CreateIssuePayload,
}

#[derive(Debug, Deserialize)]
struct CreateIssuePayload {
    issue: CreatedIssue,
}

/// Identity of an issue created on the mirror.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct CreatedIssue {
    pub id: String,
    pub number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCommentWrapper {
    add_comment: AddCommentPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCommentPayload {
    comment_edge: CommentEdge,
}

#[derive(Debug, Deserialize)]
struct CommentEdge {
    node: CreatedComment,
}

#[derive(Debug, Deserialize)]
struct CreatedComment {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

impl GraphqlResponse {
    fn into_data(self) -> Result<Value, Error> {
        if !self.errors.is_empty() {
            return Err(Error::Api(self.errors));
        }
        self.data.ok_or(Error::MissingData)
    }
}

/// One entry of a response's `errors` array.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct ApiError {
    pub message: String,
}

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Octo(#[from] octocrab::Error),
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("error from API: {}", join_messages(.0))]
    Api(Vec<ApiError>),
    #[error("response carried neither data nor errors")]
    MissingData,
    #[error("repository {0} not found")]
    RepositoryNotFound(RepoName),
    #[error("issue {repo}#{number} not found")]
    IssueNotFound { repo: RepoName, number: u64 },
}

fn join_messages(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Executes GraphQL documents against an issue tracker.
///
/// Implementations return the `data` member of the response and must turn a
/// non-empty `errors` array into [`Error::Api`].
#[async_trait]
pub(crate) trait GraphqlClient: Send + Sync {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, Error>;
}

#[async_trait]
impl<C: GraphqlClient + ?Sized> GraphqlClient for &C {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, Error> {
        (**self).query(document, variables).await
    }
}

/// GitHub's GraphQL endpoint, authenticated with a single token.
///
/// Requests are sent exactly once. A mutation that timed out upstream may
/// still have been applied, so resending it could file duplicates.
pub(crate) struct Octo {
    crab: Octocrab,
}

impl Octo {
    pub(crate) fn new(token: String) -> Result<Octo, Error> {
        Octo::connect(token, None)
    }

    fn connect(token: String, base_uri: Option<&str>) -> Result<Octo, Error> {
        let mut builder = Octocrab::builder();
        builder.add_retry_config(RetryConfig::None);
        if let Some(uri) = base_uri {
            builder = builder.base_uri(uri)?;
        }
        let crab = builder.personal_token(token).build()?;
        Ok(Octo { crab })
    }
}

#[async_trait]
impl GraphqlClient for Octo {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, Error> {
        let response: GraphqlResponse = self
            .crab
            .post(
                "/graphql",
                Some(&json!({
                    "query": document,
                    "variables": variables
                })),
            )
            .await?;
        response.into_data()
    }
}

pub(crate) async fn query_as<C, R>(
    client: &C,
    document: &str,
    variables: Value,
) -> Result<R, Error>
where
    C: GraphqlClient + ?Sized,
    R: DeserializeOwned,
{
    let data = client.query(document, variables).await?;
    Ok(serde_json::from_value(data)?)
}

enum PaginationState {
    Next(Option<String>),
    Done,
}

fn issue_pages<'a, C: GraphqlClient + ?Sized>(
    client: &'a C,
    repo: &'a RepoName,
) -> impl futures::Stream<Item = Result<GraphqlIssuesPage, Error>> + 'a {
    futures::stream::try_unfold(
        PaginationState::Next(None),
        move |state| async move {
            let after = match state {
                PaginationState::Done => return Ok(None),
                PaginationState::Next(after) => after,
            };
            debug!(%repo, ?after, "fetching issues page");
            let mut vars = repo.variables();
            vars["after"] = json!(after);
            let wrapper: GraphqlIssuesRepositoryWrapper =
                query_as(client, ISSUES_QUERY, vars).await?;
            let page = wrapper
                .repository
                .ok_or_else(|| Error::RepositoryNotFound(repo.clone()))?;
            let next_state = match page.issues.page_info.next_cursor() {
                Some(cursor) => PaginationState::Next(Some(cursor.to_string())),
                None => PaginationState::Done,
            };
            Ok::<_, Error>(Some((page, next_state)))
        },
    )
}

/// Fetches every issue of `repo`, each with its complete comment history,
/// oldest first.
pub(crate) async fn fetch_repository<C, I>(
    client: &C,
    repo: &RepoName,
) -> Result<Repository<I>, Error>
where
    C: GraphqlClient + ?Sized,
    I: From<GraphqlIssue>,
{
    let mut pages = Box::pin(issue_pages(client, repo));
    let mut id = None;
    let mut issues = Vec::new();
    while let Some(page) = pages.try_next().await? {
        id.get_or_insert(page.id);
        for mut issue in page.issues.nodes {
            complete_comments(client, repo, &mut issue).await?;
            issues.push(I::from(issue));
        }
    }
    let id = id.ok_or_else(|| Error::RepositoryNotFound(repo.clone()))?;
    debug!(%repo, issues = issues.len(), "fetched repository");
    Ok(Repository { id, issues })
}

async fn complete_comments<C: GraphqlClient + ?Sized>(
    client: &C,
    repo: &RepoName,
    issue: &mut GraphqlIssue,
) -> Result<(), Error> {
    let mut after = issue.comments.page_info.next_cursor().map(str::to_string);
    while let Some(cursor) = after {
        debug!(%repo, number = issue.number, "loading additional comments");
        let mut vars = repo.variables();
        vars["number"] = json!(issue.number);
        vars["after"] = json!(cursor);
        let next_page: GraphqlCommentsRepositoryWrapper =
            query_as(client, ISSUE_COMMENTS_QUERY, vars).await?;
        let comments = next_page
            .repository
            .and_then(|r| r.issue)
            .ok_or_else(|| Error::IssueNotFound {
                repo: repo.clone(),
                number: issue.number,
            })?
            .comments;
        after = comments.page_info.next_cursor().map(str::to_string);
        issue.comments.nodes.extend(comments.nodes);
    }
    Ok(())
}

/// Login of the account the client is authenticated as.
pub(crate) async fn viewer_login<C>(client: &C) -> Result<String, Error>
where
    C: GraphqlClient + ?Sized,
{
    let wrapper: ViewerWrapper = query_as(client, VIEWER_LOGIN_QUERY, json!({})).await?;
    Ok(wrapper.viewer.login)
}

pub(crate) async fn create_issue<C: GraphqlClient + ?Sized>(
    client: &C,
    repository_id: &str,
    title: &str,
    body: &str,
) -> Result<CreatedIssue, Error> {
    let vars = json!({
        "repository_id": repository_id,
        "title": title,
        "body": body,
    });
    let wrapper: CreateIssueWrapper = query_as(client, CREATE_ISSUE_MUTATION, vars).await?;
    Ok(wrapper.create_issue.issue)
}

pub(crate) async fn add_comment<C: GraphqlClient + ?Sized>(
    client: &C,
    subject_id: &str,
    body: &str,
) -> Result<String, Error> {
    let vars = json!({
        "subject_id": subject_id,
        "body": body,
    });
    let wrapper: AddCommentWrapper = query_as(client, ADD_COMMENT_MUTATION, vars).await?;
    Ok(wrapper.add_comment.comment_edge.node.id)
}

impl From<GraphqlAuthor> for Author {
    fn from(a: GraphqlAuthor) -> Self {
        Author {
            login: a.login,
            url: a.url,
            avatar_url: a.avatar_url,
        }
    }
}

fn author_or_ghost(author: Option<GraphqlAuthor>) -> Author {
    author.map(Author::from).unwrap_or_else(Author::ghost)
}

impl From<GraphqlComment> for ContentItem {
    fn from(c: GraphqlComment) -> Self {
        ContentItem {
            body: c.body,
            created_at: c.created_at,
            url: c.url,
            author: author_or_ghost(c.author),
        }
    }
}

impl From<GraphqlComment> for MirrorComment {
    fn from(c: GraphqlComment) -> Self {
        MirrorComment {
            author_login: c.author.map(|a| a.login),
        }
    }
}

impl From<GraphqlIssue> for SourceIssue {
    fn from(issue: GraphqlIssue) -> Self {
        SourceIssue {
            number: issue.number,
            title: issue.title,
            content: ContentItem {
                body: issue.body.unwrap_or_default(),
                created_at: issue.created_at,
                url: issue.url,
                author: author_or_ghost(issue.author),
            },
            comments: issue.comments.nodes.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<GraphqlIssue> for MirrorIssue {
    fn from(issue: GraphqlIssue) -> Self {
        MirrorIssue {
            id: issue.id,
            number: issue.number,
            title: issue.title,
            comments: issue.comments.nodes.into_iter().map(Into::into).collect(),
        }
    }
}
