//! MediaWiki `action=parse` client for year pages.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};

use crate::events::EventSource;
use crate::http::fetch_json;

const MEDIAWIKI_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// One heading from a page's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TocItem {
    #[serde(default)]
    pub line: String,
    /// Section index usable with `section=`; a string in the API.
    #[serde(default)]
    pub index: String,
    #[serde(default, alias = "tocLevel", deserialize_with = "lenient_level")]
    pub level: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ParseResponse<T> {
    parse: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TocParse {
    tocdata: Option<TocData>,
}

/// `tocdata` is `{ "sections": [...] }` today; older responses sent the bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TocData {
    Sections { sections: Vec<TocItem> },
    Flat(Vec<TocItem>),
}

#[derive(Debug, Deserialize)]
struct WikitextParse {
    #[serde(default)]
    wikitext: String,
}

fn lenient_level<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Level {
        Number(u32),
        Text(String),
    }

    Ok(match Option::<Level>::deserialize(deserializer)? {
        Some(Level::Number(n)) => Some(n),
        Some(Level::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

pub struct MediaWikiClient {
    http: Client,
    api_url: String,
}

impl MediaWikiClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            api_url: MEDIAWIKI_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn parse_request(&self, year: i32, prop: &str) -> reqwest::RequestBuilder {
        let page = year.to_string();
        self.http.get(&self.api_url).query(&[
            ("action", "parse"),
            ("page", page.as_str()),
            ("prop", prop),
            ("format", "json"),
            ("formatversion", "2"),
        ])
    }
}

#[async_trait]
impl EventSource for MediaWikiClient {
    async fn table_of_contents(&self, year: i32) -> Result<Vec<TocItem>> {
        let response: ParseResponse<TocParse> =
            fetch_json(self.parse_request(year, "tocdata"), "mediawiki-toc").await?;
        Ok(match response.parse.and_then(|p| p.tocdata) {
            Some(TocData::Sections { sections }) => sections,
            Some(TocData::Flat(items)) => items,
            None => Vec::new(),
        })
    }

    async fn section_wikitext(&self, year: i32, section: &str) -> Result<String> {
        let request = self
            .parse_request(year, "wikitext")
            .query(&[("section", section)]);
        let response: ParseResponse<WikitextParse> =
            fetch_json(request, "mediawiki-section").await?;
        Ok(response.parse.map(|p| p.wikitext).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::decode_json;

    #[test]
    fn test_toc_sections_shape() {
        let body = r#"{"parse": {"title": "1969", "tocdata": {"sections": [
            {"tocLevel": 1, "hLevel": 2, "line": "Events", "number": "1", "index": "1"},
            {"tocLevel": 2, "hLevel": 3, "line": "January", "number": "1.1", "index": "2"}
        ]}}}"#;
        let response: ParseResponse<TocParse> = decode_json(body).unwrap();
        let Some(TocData::Sections { sections }) = response.parse.and_then(|p| p.tocdata) else {
            panic!("expected sections shape");
        };
        assert_eq!(
            sections[1],
            TocItem {
                line: "January".to_string(),
                index: "2".to_string(),
                level: Some(2)
            }
        );
    }

    #[test]
    fn test_toc_flat_shape_with_string_level() {
        let body = r#"{"parse": {"tocdata": [{"line": "Births", "index": "14", "level": "1"}]}}"#;
        let response: ParseResponse<TocParse> = decode_json(body).unwrap();
        let Some(TocData::Flat(items)) = response.parse.and_then(|p| p.tocdata) else {
            panic!("expected flat shape");
        };
        assert_eq!(items[0].level, Some(1));
    }

    #[test]
    fn test_missing_page_has_no_parse() {
        let body = r#"{"error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}}"#;
        let response: ParseResponse<WikitextParse> = decode_json(body).unwrap();
        assert!(response.parse.is_none());
    }
}
