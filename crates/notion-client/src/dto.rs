//! Notion wire types

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PageDto {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<PageDto>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlainText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseDto {
    pub id: String,
    #[serde(default)]
    pub title: Vec<PlainText>,
}

impl DatabaseDto {
    pub fn name(&self) -> String {
        self.title.iter().map(|t| t.plain_text.as_str()).collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
