use chrono::SecondsFormat;
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::issue::ContentItem;

const ATTRIBUTION_NAME: &str = "attribution.md";
const ATTRIBUTION: &str = include_str!("./attribution.md.tera");

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),
}

/// Title under which the mirror of source issue `number` is filed.
pub(crate) fn mirror_title(number: u64, title: &str) -> String {
    format!("Mirror #{}: {}", number, title)
}

#[derive(Serialize)]
struct Attribution<'a> {
    login: &'a str,
    profile_url: &'a str,
    avatar_url: &'a str,
    created_at: String,
    url: &'a str,
    body: &'a str,
}

impl<'a> From<&'a ContentItem> for Attribution<'a> {
    fn from(item: &'a ContentItem) -> Self {
        Attribution {
            login: &item.author.login,
            profile_url: &item.author.url,
            avatar_url: &item.author.avatar_url,
            created_at: item.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            url: &item.url,
            body: &item.body,
        }
    }
}

/// Renders issue bodies and comments as attributed quotes of their author.
pub(crate) struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub(crate) fn new() -> Result<Renderer, Error> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(ATTRIBUTION_NAME, ATTRIBUTION)?;
        Ok(Renderer { tera })
    }

    pub(crate) fn render(&self, item: &ContentItem) -> Result<String, Error> {
        let context = Context::from_serialize(Attribution::from(item))?;
        Ok(self.tera.render(ATTRIBUTION_NAME, &context)?)
    }
}
