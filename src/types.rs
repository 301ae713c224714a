use serde::{Deserialize, Serialize};

/// Caller-supplied parameters for one Arjun run.
///
/// Field names follow the tool's wire schema. Empty strings are treated the
/// same as missing fields when the argument vector is built.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default, rename = "url")]
    pub target: Option<String>,
    #[serde(default, rename = "textFile")]
    pub target_list_file: Option<String>,
    #[serde(default, rename = "wordlist")]
    pub wordlist_file: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub rate_limit: Option<i64>,
    #[serde(default)]
    pub chunk_size: Option<i64>,
}

impl ScanRequest {
    /// Request scanning a single URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            target: Some(url.into()),
            ..Default::default()
        }
    }

    /// Request scanning every URL listed in a file.
    pub fn for_list_file(path: impl Into<String>) -> Self {
        Self {
            target_list_file: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn target(&self) -> Option<&str> {
        non_empty(&self.target)
    }

    pub fn target_list_file(&self) -> Option<&str> {
        non_empty(&self.target_list_file)
    }

    pub fn wordlist_file(&self) -> Option<&str> {
        non_empty(&self.wordlist_file)
    }

    pub fn method(&self) -> Option<&str> {
        non_empty(&self.method)
    }

    /// True when at least one of `url` / `textFile` carries a value.
    pub fn has_target(&self) -> bool {
        self.target().is_some() || self.target_list_file().is_some()
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Outcome of one finished subprocess.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub exit_code: i32,
    /// stdout followed by stderr, trimmed.
    pub combined_output: String,
    pub duration_ms: u64,
    pub finished_at: String,
}

impl ScanResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_names() {
        let req: ScanRequest = serde_json::from_str(
            r#"{"url":"http://t","textFile":"urls.txt","wordlist":"w.txt","method":"POST","rateLimit":5,"chunkSize":250}"#,
        )
        .unwrap();
        assert_eq!(req.target(), Some("http://t"));
        assert_eq!(req.target_list_file(), Some("urls.txt"));
        assert_eq!(req.wordlist_file(), Some("w.txt"));
        assert_eq!(req.method(), Some("POST"));
        assert_eq!(req.rate_limit, Some(5));
        assert_eq!(req.chunk_size, Some(250));
    }

    #[test]
    fn missing_and_null_fields_are_absent() {
        let req: ScanRequest = serde_json::from_str(r#"{"rateLimit":null}"#).unwrap();
        assert_eq!(req, ScanRequest::default());
        assert!(!req.has_target());
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let req = ScanRequest {
            target: Some(String::new()),
            target_list_file: Some(String::new()),
            ..Default::default()
        };
        assert!(!req.has_target());
        assert!(ScanRequest::for_list_file("urls.txt").has_target());
    }
}
