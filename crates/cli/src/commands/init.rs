use std::{fs, path::Path};

use alloy::signers::local::PrivateKeySigner;
use dialoguer::Input;
use rbundler_core::{BundlerConfig, CONFIG_FILE_NAME};

use crate::{commands::error::InitError, print_error_message, print_success_message};

const RELAY_WALLETS: usize = 2;

fn generate_env(provider_url: &str) -> String {
    let mut env = format!("PROVIDER_URL={}\n", provider_url);
    for index in 1..=RELAY_WALLETS {
        let signer = PrivateKeySigner::random();
        env.push_str(&format!("RELAY_WALLET_KEY_{}={}\n", index, signer.to_bytes()));
    }

    env
}

/// Lays out a fresh project: config, relay wallet keys in `.env` and a `.gitignore` for them.
pub fn write_project(project_path: &Path, name: &str, provider_url: &str) -> Result<(), InitError> {
    if project_path.exists() {
        return Err(InitError::AlreadyExists(project_path.display().to_string()));
    }

    fs::create_dir_all(project_path)?;

    let yaml = serde_yaml::to_string(&BundlerConfig::template(name))?;
    fs::write(project_path.join(CONFIG_FILE_NAME), yaml)?;
    fs::write(project_path.join(".env"), generate_env(provider_url))?;
    fs::write(project_path.join(".gitignore"), ".env\n")?;

    Ok(())
}

pub async fn handle_init(path: &Path) -> Result<(), InitError> {
    let project_name: String = Input::new().with_prompt("Enter project name").interact_text()?;

    let provider_url: String = Input::new()
        .with_prompt("Enter the node RPC url")
        .default("http://localhost:8545".to_string())
        .interact_text()?;

    let project_path = path.join(&project_name);
    write_project(&project_path, &project_name, &provider_url).inspect_err(|e| {
        print_error_message(&format!("Failed to initialize project: {}", e));
    })?;

    print_success_message(&format!(
        "\nProject '{}' initialized successfully! {} fresh relay wallet keys were written to .env, fund them before running `rbundler start`",
        project_name, RELAY_WALLETS
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use rbundler_core::parse;

    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir().join(format!("rbundler-{}-{}", name, nanos))
    }

    #[test]
    fn test_write_project_creates_loadable_config() {
        let project_path = scratch_dir("init");

        write_project(&project_path, "my-bundler", "http://localhost:8545").unwrap();

        let yaml = fs::read_to_string(project_path.join(CONFIG_FILE_NAME)).unwrap();
        let config = parse(&yaml, true).unwrap();
        assert_eq!(config.name, "my-bundler");
        assert_eq!(config.signing_keys.len(), RELAY_WALLETS);

        let env = fs::read_to_string(project_path.join(".env")).unwrap();
        assert!(env.starts_with("PROVIDER_URL=http://localhost:8545\n"));
        assert_eq!(env.matches("RELAY_WALLET_KEY_").count(), RELAY_WALLETS);

        fs::remove_dir_all(&project_path).unwrap();
    }

    #[test]
    fn test_write_project_refuses_existing_directory() {
        let project_path = scratch_dir("existing");
        fs::create_dir_all(&project_path).unwrap();

        let result = write_project(&project_path, "my-bundler", "http://localhost:8545");

        assert!(matches!(result, Err(InitError::AlreadyExists(_))));
        fs::remove_dir_all(&project_path).unwrap();
    }
}
