use rbundler_core::start;

use crate::{
    commands::error::{ProjectLocationError, ProjectStartupError},
    print_error_message,
    project_location::ProjectLocation,
};

pub async fn handle_start(project_location: &ProjectLocation) -> Result<(), ProjectStartupError> {
    if !project_location.is_initialized() {
        let error = ProjectLocationError::NotInitialized(project_location.path().display().to_string());
        print_error_message(&error.to_string());
        return Err(error.into());
    }

    start(project_location.path()).await.inspect_err(|e| print_error_message(&e.to_string()))?;

    Ok(())
}
