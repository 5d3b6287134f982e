use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::FactorSource;
use crate::core::{FactorTable, FlightControl, FxError, FxResult, LoadCallback};

/// Reads `SYMBOL,FACTOR` rows from a local file.
///
/// A missing file yields an identity table rather than an error.
pub struct FileSource {
    path: PathBuf,
    flight: FlightControl,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flight: FlightControl::new("file"),
        }
    }

    async fn read(&self) -> FxResult<FactorTable> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(FactorTable::parse_csv(&data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Factor file not found, using identity table");
                Ok(FactorTable::new())
            }
            Err(e) => Err(FxError::load_failed(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl FactorSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> FxResult<FactorTable> {
        let flight = self.flight.begin()?;
        flight.run(self.read()).await
    }

    fn load_async(self: Arc<Self>, on_done: LoadCallback) -> FxResult<()> {
        let flight = self.flight.begin()?;
        flight.spawn(async move { self.read().await }, on_done)
    }

    fn cancel(&self) {
        self.flight.cancel();
    }

    fn dispose(&self) {
        self.flight.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Currency, LoadOutcome};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_reads_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("factors.csv");
        std::fs::write(&path, "CURRENCY,FACTOR\nEUR,1.4\nAUD,1.5\r\n\nJPY,2\n\nUAH,0.2").unwrap();

        let table = FileSource::new(&path).load().await.unwrap();
        assert_eq!(table.get(Currency::Eur), dec!(1.4));
        assert_eq!(table.get(Currency::Aud), dec!(1.5));
        assert_eq!(table.get(Currency::Jpy), dec!(2));
        assert_eq!(table.get(Currency::Uah), dec!(0.2));
    }

    #[tokio::test]
    async fn test_missing_file_is_identity() {
        let dir = TempDir::new().unwrap();
        let source = FileSource::new(dir.path().join("absent.csv"));
        assert!(source.load().await.unwrap().is_identity());
    }

    #[tokio::test]
    async fn test_load_async_delivers_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("factors.csv");
        std::fs::write(&path, "GBP,1.25").unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        Arc::new(FileSource::new(&path))
            .load_async(Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }))
            .unwrap();

        match rx.await.unwrap() {
            LoadOutcome::Loaded(table) => assert_eq!(table.get(Currency::Gbp), dec!(1.25)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disposed_source_refuses_loads() {
        let source = FileSource::new("unused.csv");
        source.dispose();
        assert!(matches!(source.load().await, Err(FxError::Disposed(_))));
    }
}
