use std::path::{Path, PathBuf};

/// Loads the project's `.env`, or one found from the working directory upwards when the
/// project has none. Returns the file that was loaded.
pub fn load_env_from_project_path(project_path: &Path) -> Option<PathBuf> {
    let project_env = project_path.join(".env");
    match dotenvy::from_path(&project_env) {
        Ok(()) => Some(project_env),
        Err(_) => dotenvy::dotenv().ok(),
    }
}
