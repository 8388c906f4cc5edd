use std::path::PathBuf;

use rbundler_core::{read, BundlerConfig, CONFIG_FILE_NAME};

use crate::commands::error::ProjectLocationError;

#[derive(Debug, Clone)]
pub struct ProjectLocation {
    output_dir: PathBuf,
}

impl ProjectLocation {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn path(&self) -> &PathBuf {
        &self.output_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.output_dir.join(CONFIG_FILE_NAME)
    }

    pub fn is_initialized(&self) -> bool {
        self.config_path().exists()
    }

    pub fn setup_config(&self, raw_yaml: bool) -> Result<BundlerConfig, ProjectLocationError> {
        if !self.is_initialized() {
            return Err(ProjectLocationError::NotInitialized(self.output_dir.display().to_string()));
        }

        read(&self.config_path(), raw_yaml).map_err(ProjectLocationError::ProjectConfig)
    }
}
