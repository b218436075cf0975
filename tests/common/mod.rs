#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use bronze_customers::config::{DataConfig, PipelineConfig};
use tempfile::{TempDir, tempdir};

/// Raw file covering the three cleaning paths: out-of-range age, accented
/// name, missing city.
pub const THREE_ROW_RAW: &str = "\
CustomerName, Idade, Cidade
  maria   SOUZA , 150, rio de janeiro
joão   DA  silva, 42.0 , São Paulo
ana,30,
";

/// Scratch data root laid out as `<root>/raw` and `<root>/bronze`.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` under the workspace, creating parent folders.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn write_raw(&self, contents: &str) -> PathBuf {
        self.write("raw/customers.csv", contents)
    }

    pub fn data_config(&self) -> DataConfig {
        DataConfig {
            root: self.path().to_path_buf(),
            ..DataConfig::default()
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            data: self.data_config(),
            ..PipelineConfig::default()
        }
    }

    pub fn read_bronze(&self) -> String {
        fs::read_to_string(self.data_config().bronze_path()).expect("read bronze file")
    }
}
