use crate::entry::{ChatId, LedgerEntry};
use crate::{LedgerBook, LedgerError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Durable target of a flush. Receives the whole book every time.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    async fn persist(&self, book: &LedgerBook) -> Result<()>;
}

/// The pretty-printed JSON document holding every chat ledger.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document, first creating it as `{}` (with its parent
    /// directories) when it does not exist yet.
    pub async fn load_or_init(&self) -> Result<LedgerBook> {
        if !tokio::fs::try_exists(&self.path).await? {
            log::info!("Creating empty ledger at {}", self.path.display());
            let book = LedgerBook::new();
            self.write(&book).await?;
            return Ok(book);
        }
        self.load().await
    }

    pub async fn load(&self) -> Result<LedgerBook> {
        let bytes = tokio::fs::read(&self.path).await?;
        let entries: BTreeMap<ChatId, LedgerEntry> = serde_json::from_slice(&bytes)?;
        Ok(LedgerBook::from_entries(entries))
    }

    /// Rewrites the whole document through a temporary sibling so readers
    /// never observe a partial file.
    pub async fn write(&self, book: &LedgerBook) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| LedgerError::InvalidPath(self.path.display().to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(book)?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerSink for LedgerFile {
    async fn persist(&self, book: &LedgerBook) -> Result<()> {
        self.write(book).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Category;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_is_created_empty() {
        let dir = tempdir().unwrap();
        let file = LedgerFile::new(dir.path().join("data").join("payments.json"));

        let book = file.load_or_init().await.unwrap();
        assert!(book.is_empty());
        let raw = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(raw.trim(), "{}");
    }

    #[tokio::test]
    async fn write_then_load_reproduces_the_book() {
        let dir = tempdir().unwrap();
        let file = LedgerFile::new(dir.path().join("payments.json"));
        let now = Utc.with_ymd_and_hms(2025, 9, 5, 12, 0, 0).unwrap();

        let mut book = LedgerBook::new();
        book.mark_paid("G1@g.us", Category::Mensalidade, "Ana", now);
        book.mark_paid("G1@g.us", Category::Churrasco, "Bruno", now);
        book.ensure_entry("G2@g.us", now);
        file.write(&book).await.unwrap();

        assert_eq!(file.load_or_init().await.unwrap(), book);
        assert!(!dir.path().join("payments.json.tmp").exists());
    }

    #[tokio::test]
    async fn reads_documents_written_by_the_previous_bot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payments.json");
        std::fs::write(
            &path,
            r#"{
  "120363@g.us": {
    "updatedAt": "2025-09-05T12:00:00.000Z",
    "payments": { "mensalidade": { "Ana": true }, "churrasco": {}, "diaria": {} }
  }
}"#,
        )
        .unwrap();

        let book = LedgerFile::new(&path).load().await.unwrap();
        let entry = book.get("120363@g.us").unwrap();
        assert_eq!(entry.chat_id, "120363@g.us");
        assert!(entry.is_paid(Category::Mensalidade, "Ana"));
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("payments.json");
        std::fs::write(&path, "not json").unwrap();
        let err = LedgerFile::new(&path).load().await.unwrap_err();
        assert!(matches!(err, LedgerError::JsonError(_)));
    }
}
