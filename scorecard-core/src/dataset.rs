//! Dataset identifiers, sources and JSONL parsing.

use crate::config::DatasetConfig;
use crate::error::{EvalError, Result};
use crate::format::RawExample;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A `provider:filename` dataset identifier. Only the filename selects the
/// file; the provider prefix is informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetId {
    raw: String,
    provider: String,
    filename: String,
}

impl DatasetId {
    pub fn parse(raw: &str) -> Result<Self> {
        let (provider, rest) = raw
            .split_once(':')
            .ok_or_else(|| EvalError::InvalidDatasetId(raw.to_string()))?;
        // Anything after a second colon is ignored.
        let filename = rest.split(':').next().unwrap_or_default();
        if filename.is_empty() || filename.contains("..") || filename.starts_with('/') {
            return Err(EvalError::InvalidDatasetId(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            provider: provider.to_string(),
            filename: filename.to_string(),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Where dataset files come from.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch the full newline-delimited JSON text for `id`.
    async fn fetch(&self, id: &DatasetId) -> Result<String>;
}

/// Reads `<root>/<filename>` from disk.
#[derive(Debug, Clone)]
pub struct LocalDatasetSource {
    root: PathBuf,
}

impl LocalDatasetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DatasetSource for LocalDatasetSource {
    async fn fetch(&self, id: &DatasetId) -> Result<String> {
        let path = self.root.join(id.filename());
        tracing::debug!(path = %path.display(), "Reading dataset file");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| EvalError::dataset_fetch(format!("{}: {e}", path.display())))
    }
}

/// Fetches `<base_url>/<filename>` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDatasetSource {
    client: Client,
    base_url: String,
}

impl HttpDatasetSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, id: &DatasetId) -> String {
        format!("{}/{}", self.base_url, id.filename())
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    async fn fetch(&self, id: &DatasetId) -> Result<String> {
        let url = self.url_for(id);
        tracing::debug!(url = %url, "Fetching dataset");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EvalError::dataset_fetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EvalError::dataset_fetch(
                status.canonical_reason().unwrap_or(status.as_str()),
            ));
        }
        Ok(response.text().await?)
    }
}

/// HTTP when a base URL is configured, the local root otherwise.
pub fn build_source(config: &DatasetConfig) -> Arc<dyn DatasetSource> {
    match &config.base_url {
        Some(base_url) => Arc::new(HttpDatasetSource::new(base_url)),
        None => Arc::new(LocalDatasetSource::new(config.root.clone())),
    }
}

/// Parse newline-delimited JSON, one record per non-blank line.
pub fn parse_jsonl(text: &str) -> Result<Vec<RawExample>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| EvalError::MalformedRecord {
                line: index + 1,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve `404 Not Found` to every connection; returns the base URL.
    async fn serve_not_found() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_dataset_id_strips_provider() {
        let id = DatasetId::parse("huggingface:truthful_qa.jsonl").unwrap();
        assert_eq!(id.provider(), "huggingface");
        assert_eq!(id.filename(), "truthful_qa.jsonl");
        assert_eq!(id.to_string(), "huggingface:truthful_qa.jsonl");
    }

    #[test]
    fn test_dataset_id_rejects_bad_shapes() {
        assert!(matches!(
            DatasetId::parse("no-colon.jsonl"),
            Err(EvalError::InvalidDatasetId(_))
        ));
        assert!(DatasetId::parse("local:").is_err());
        assert!(DatasetId::parse("local:../secrets").is_err());
        assert!(DatasetId::parse("local:/etc/passwd").is_err());
    }

    #[test]
    fn test_parse_jsonl_skips_blank_lines() {
        let records = parse_jsonl("{\"a\": 1}\n\n  \n{\"b\": 2}\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["b"], 2);
    }

    #[test]
    fn test_parse_jsonl_reports_line_number() {
        let err = parse_jsonl("{\"a\": 1}\n{oops\n").unwrap_err();
        assert!(matches!(err, EvalError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_http_url_join() {
        let source = HttpDatasetSource::new("http://localhost:8000/datasets/");
        let id = DatasetId::parse("local:arc.jsonl").unwrap();
        assert_eq!(source.url_for(&id), "http://localhost:8000/datasets/arc.jsonl");
    }

    #[tokio::test]
    async fn test_local_source_reads_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("tiny.jsonl")).unwrap();
        writeln!(file, "{{\"question\": \"q\"}}").unwrap();

        let source = LocalDatasetSource::new(dir.path());
        let text = source
            .fetch(&DatasetId::parse("local:tiny.jsonl").unwrap())
            .await
            .unwrap();
        assert!(text.contains("question"));

        let missing = source
            .fetch(&DatasetId::parse("local:missing.jsonl").unwrap())
            .await;
        assert!(matches!(missing, Err(EvalError::DatasetFetch(_))));
    }

    #[tokio::test]
    async fn test_http_error_status_is_fetch_failure() {
        let source = HttpDatasetSource::new(&serve_not_found().await);
        let err = source
            .fetch(&DatasetId::parse("local:missing.jsonl").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(&err, EvalError::DatasetFetch(reason) if reason == "Not Found"));
        assert_eq!(err.to_string(), "Failed to load dataset: Not Found");
    }
}
