//! In-memory issue tracker speaking the handful of GraphQL documents the
//! mirror sends.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::graphql::{
    self, ApiError, GraphqlClient, ADD_COMMENT_MUTATION, CREATE_ISSUE_MUTATION,
    ISSUES_QUERY, ISSUE_COMMENTS_QUERY, VIEWER_LOGIN_QUERY,
};
use crate::issue::{Author, ContentItem, SourceIssue};
use crate::progress::Progress;

#[derive(Clone, Debug)]
pub(crate) struct FakeComment {
    pub body: String,
    pub author: Option<Author>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub(crate) struct FakeIssue {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub author: Option<Author>,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub comments: Vec<FakeComment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Mutation {
    CreateIssue { repository_id: String, title: String },
    AddComment { subject_id: String, body: String },
}

struct FakeRepo {
    id: String,
    issues: Vec<FakeIssue>,
}

#[derive(Default)]
struct State {
    repos: BTreeMap<String, FakeRepo>,
    mutations: Vec<Mutation>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn issue_by_id(&mut self, id: &str) -> Option<&mut FakeIssue> {
        self.repos
            .values_mut()
            .find_map(|repo| repo.issues.iter_mut().find(|i| i.id == id))
    }
}

pub(crate) struct FakeTracker {
    viewer: String,
    page_size: usize,
    fail_mutation: Option<usize>,
    fail_viewer: bool,
    state: Mutex<State>,
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()
}

fn author(login: &str) -> Author {
    Author {
        login: login.to_string(),
        url: format!("https://github.com/{}", login),
        avatar_url: format!("https://avatars.example/{}.png", login),
    }
}

fn fake_comment(c: &ContentItem) -> FakeComment {
    FakeComment {
        body: c.body.clone(),
        author: Some(c.author.clone()),
        url: c.url.clone(),
        created_at: c.created_at,
    }
}

fn injected_failure() -> graphql::Error {
    graphql::Error::Api(vec![ApiError {
        message: "injected failure".to_string(),
    }])
}

impl FakeTracker {
    pub(crate) fn new(viewer: &str) -> FakeTracker {
        FakeTracker {
            viewer: viewer.to_string(),
            page_size: 100,
            fail_mutation: None,
            fail_viewer: false,
            state: Mutex::new(State::default()),
        }
    }

    pub(crate) fn with_page_size(mut self, page_size: usize) -> FakeTracker {
        self.page_size = page_size;
        self
    }

    pub(crate) fn with_repo(self, name: &str, id: &str) -> FakeTracker {
        self.state.lock().unwrap().repos.insert(
            name.to_string(),
            FakeRepo {
                id: id.to_string(),
                issues: Vec::new(),
            },
        );
        self
    }

    /// Makes the mutation with this zero-based index fail.
    pub(crate) fn failing_mutation(mut self, index: usize) -> FakeTracker {
        self.fail_mutation = Some(index);
        self
    }

    pub(crate) fn failing_viewer(mut self) -> FakeTracker {
        self.fail_viewer = true;
        self
    }

    pub(crate) fn failing_never(mut self) -> FakeTracker {
        self.fail_mutation = None;
        self
    }

    pub(crate) fn push_source(&self, repo: &str, issue: &SourceIssue) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("I");
        let repo = state.repos.get_mut(repo).expect("unknown repository");
        repo.issues.push(FakeIssue {
            id,
            number: issue.number,
            title: issue.title.clone(),
            body: issue.content.body.clone(),
            author: Some(issue.content.author.clone()),
            url: issue.content.url.clone(),
            created_at: issue.content.created_at,
            comments: issue.comments.iter().map(fake_comment).collect(),
        });
    }

    /// Files an issue authored by the viewer whose comments are written by
    /// `comment_authors`, returning its id.
    pub(crate) fn push_issue(
        &self,
        repo: &str,
        title: &str,
        comment_authors: &[&str],
    ) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("I");
        let repo_name = repo.to_string();
        let repo = state.repos.get_mut(repo).expect("unknown repository");
        let number = repo.issues.iter().map(|i| i.number).max().unwrap_or(0) + 1;
        let url = format!("https://github.com/{}/issues/{}", repo_name, number);
        repo.issues.push(FakeIssue {
            id: id.clone(),
            number,
            title: title.to_string(),
            body: String::new(),
            author: Some(author(&self.viewer)),
            url: url.clone(),
            created_at: created_at(),
            comments: comment_authors
                .iter()
                .enumerate()
                .map(|(i, login)| FakeComment {
                    body: format!("comment {}", i),
                    author: Some(author(login)),
                    url: format!("{}#issuecomment-{}", url, i),
                    created_at: created_at(),
                })
                .collect(),
        });
        id
    }

    pub(crate) fn issues(&self, repo: &str) -> Vec<FakeIssue> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .get(repo)
            .map(|r| r.issues.clone())
            .unwrap_or_default()
    }

    pub(crate) fn mutations(&self) -> Vec<Mutation> {
        self.state.lock().unwrap().mutations.clone()
    }

    fn page<'a, T>(&self, items: &'a [T], after: &Value) -> (&'a [T], Value) {
        let start = after
            .as_str()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0)
            .min(items.len());
        let end = (start + self.page_size).min(items.len());
        let has_next_page = end < items.len();
        let end_cursor = if has_next_page { Some(end.to_string()) } else { None };
        let page_info = json!({
            "hasNextPage": has_next_page,
            "endCursor": end_cursor,
        });
        (&items[start..end], page_info)
    }

    fn comments_json(&self, comments: &[FakeComment], after: &Value) -> Value {
        let (page, page_info) = self.page(comments, after);
        json!({
            "nodes": page.iter().map(comment_json).collect::<Vec<_>>(),
            "pageInfo": page_info,
        })
    }

    fn issues_page(&self, state: &State, variables: &Value) -> Value {
        let name = repo_name(variables);
        let repo = match state.repos.get(&name) {
            Some(repo) => repo,
            None => return json!({ "repository": null }),
        };
        let (page, page_info) = self.page(&repo.issues, &variables["after"]);
        let nodes: Vec<Value> = page
            .iter()
            .map(|issue| {
                json!({
                    "id": issue.id,
                    "number": issue.number,
                    "title": issue.title,
                    "body": issue.body,
                    "createdAt": issue.created_at.to_rfc3339(),
                    "url": issue.url,
                    "author": author_json(&issue.author),
                    "comments": self.comments_json(&issue.comments, &Value::Null),
                })
            })
            .collect();
        json!({
            "repository": {
                "id": repo.id,
                "issues": { "nodes": nodes, "pageInfo": page_info },
            }
        })
    }

    fn issue_comments(&self, state: &State, variables: &Value) -> Value {
        let name = repo_name(variables);
        let number = variables["number"].as_u64().unwrap();
        let issue = state
            .repos
            .get(&name)
            .and_then(|r| r.issues.iter().find(|i| i.number == number));
        match issue {
            Some(issue) => {
                let comments = self.comments_json(&issue.comments, &variables["after"]);
                json!({ "repository": { "issue": { "comments": comments } } })
            }
            None => json!({ "repository": null }),
        }
    }

    fn mutate(&self, state: &mut State, mutation: Mutation) -> Result<(), graphql::Error> {
        let index = state.mutations.len();
        state.mutations.push(mutation);
        if self.fail_mutation == Some(index) {
            return Err(injected_failure());
        }
        Ok(())
    }

    fn create_issue(
        &self,
        state: &mut State,
        variables: &Value,
    ) -> Result<Value, graphql::Error> {
        let repository_id = variables["repository_id"].as_str().unwrap().to_string();
        let title = variables["title"].as_str().unwrap().to_string();
        self.mutate(
            state,
            Mutation::CreateIssue {
                repository_id: repository_id.clone(),
                title: title.clone(),
            },
        )?;
        let id = state.next_id("I");
        let (name, repo) = state
            .repos
            .iter_mut()
            .find(|(_, r)| r.id == repository_id)
            .ok_or_else(injected_failure)?;
        let number = repo.issues.iter().map(|i| i.number).max().unwrap_or(0) + 1;
        repo.issues.push(FakeIssue {
            id: id.clone(),
            number,
            title,
            body: variables["body"].as_str().unwrap().to_string(),
            author: Some(author(&self.viewer)),
            url: format!("https://github.com/{}/issues/{}", name, number),
            created_at: created_at(),
            comments: Vec::new(),
        });
        Ok(json!({ "createIssue": { "issue": { "id": id, "number": number } } }))
    }

    fn add_comment(
        &self,
        state: &mut State,
        variables: &Value,
    ) -> Result<Value, graphql::Error> {
        let subject_id = variables["subject_id"].as_str().unwrap().to_string();
        let body = variables["body"].as_str().unwrap().to_string();
        self.mutate(
            state,
            Mutation::AddComment {
                subject_id: subject_id.clone(),
                body: body.clone(),
            },
        )?;
        let comment_id = state.next_id("IC");
        let viewer = author(&self.viewer);
        let issue = state.issue_by_id(&subject_id).ok_or_else(injected_failure)?;
        let url = format!("{}#issuecomment-{}", issue.url, comment_id);
        issue.comments.push(FakeComment {
            body,
            author: Some(viewer),
            url,
            created_at: created_at(),
        });
        Ok(json!({ "addComment": { "commentEdge": { "node": { "id": comment_id } } } }))
    }
}

fn repo_name(variables: &Value) -> String {
    format!(
        "{}/{}",
        variables["owner"].as_str().unwrap(),
        variables["name"].as_str().unwrap()
    )
}

fn author_json(author: &Option<Author>) -> Value {
    match author {
        Some(a) => json!({ "login": a.login, "url": a.url, "avatarUrl": a.avatar_url }),
        None => Value::Null,
    }
}

fn comment_json(c: &FakeComment) -> Value {
    json!({
        "body": c.body,
        "createdAt": c.created_at.to_rfc3339(),
        "url": c.url,
        "author": author_json(&c.author),
    })
}

#[async_trait]
impl GraphqlClient for FakeTracker {
    async fn query(&self, document: &str, variables: Value) -> Result<Value, graphql::Error> {
        let mut state = self.state.lock().unwrap();
        if document == ISSUES_QUERY {
            Ok(self.issues_page(&state, &variables))
        } else if document == ISSUE_COMMENTS_QUERY {
            Ok(self.issue_comments(&state, &variables))
        } else if document == VIEWER_LOGIN_QUERY {
            if self.fail_viewer {
                return Err(injected_failure());
            }
            Ok(json!({ "viewer": { "login": self.viewer } }))
        } else if document == CREATE_ISSUE_MUTATION {
            self.create_issue(&mut state, &variables)
        } else if document == ADD_COMMENT_MUTATION {
            self.add_comment(&mut state, &variables)
        } else {
            panic!("unexpected document: {}", document)
        }
    }
}

/// Collects progress lines.
#[derive(Default)]
pub(crate) struct Recorder {
    lines: Mutex<Vec<String>>,
}

impl Recorder {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Progress for Recorder {
    fn report(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
