use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Body returned by write endpoints: `{"Result": "1 updated", "_href": ...}`.
#[derive(Serialize, Debug)]
pub struct OperationResult {
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_href", skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl OperationResult {
    pub fn counted(count: u64, verb: &str) -> Self {
        Self { result: format!("{count} {verb}"), id: None, href: None }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }
}
