use std::path::PathBuf;

use pricing_core::DataFrame;
use tracing::info;

use crate::error::Result;

/// Source of the train and test datasets.
///
/// Implementations must return frames sharing one column schema. Any source
/// (files, a database, an in-memory fixture) can stand behind this trait
/// without changes to the processor or trainer.
pub trait Dataloader {
    fn load_train_data(&self) -> Result<DataFrame>;

    fn load_test_data(&self) -> Result<DataFrame>;
}

#[derive(Debug, Clone)]
pub struct CsvDataloader {
    train_path: PathBuf,
    test_path: PathBuf,
}

impl CsvDataloader {
    pub fn new(train_path: impl Into<PathBuf>, test_path: impl Into<PathBuf>) -> Self {
        Self {
            train_path: train_path.into(),
            test_path: test_path.into(),
        }
    }
}

impl Dataloader for CsvDataloader {
    fn load_train_data(&self) -> Result<DataFrame> {
        let frame = DataFrame::read_csv(&self.train_path)?;
        info!(path = %self.train_path.display(), rows = frame.height(), "Loaded train data");
        Ok(frame)
    }

    fn load_test_data(&self) -> Result<DataFrame> {
        let frame = DataFrame::read_csv(&self.test_path)?;
        info!(path = %self.test_path.display(), rows = frame.height(), "Loaded test data");
        Ok(frame)
    }
}

/// Frames held in memory and handed out as copies.
#[derive(Debug, Clone)]
pub struct InMemoryDataloader {
    train: DataFrame,
    test: DataFrame,
}

impl InMemoryDataloader {
    pub fn new(train: DataFrame, test: DataFrame) -> Self {
        Self { train, test }
    }
}

impl Dataloader for InMemoryDataloader {
    fn load_train_data(&self) -> Result<DataFrame> {
        Ok(self.train.clone())
    }

    fn load_test_data(&self) -> Result<DataFrame> {
        Ok(self.test.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainingError;

    #[test]
    fn csv_loader_reads_both_splits() {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("train.csv");
        let test = dir.path().join("test.csv");
        std::fs::write(&train, "id,type,price\n1,casa,100\n2,departamento,80\n").unwrap();
        std::fs::write(&test, "id,type,price\n3,casa,90\n").unwrap();

        let loader = CsvDataloader::new(&train, &test);
        assert_eq!(loader.load_train_data().unwrap().shape(), (2, 3));
        assert_eq!(loader.load_test_data().unwrap().shape(), (1, 3));
    }

    #[test]
    fn missing_csv_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = CsvDataloader::new(dir.path().join("a.csv"), dir.path().join("b.csv"));
        assert!(matches!(
            loader.load_train_data(),
            Err(TrainingError::Data(_))
        ));
    }
}
