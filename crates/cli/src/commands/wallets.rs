use alloy::primitives::utils::format_ether;
use rbundler_core::{
    provider::{ChainClient, EvmProvider},
    wallet::{signer_address, signers_from_keys},
};

use crate::{
    commands::error::WalletsError,
    console::{print_table, print_warn_message},
    project_location::ProjectLocation,
};

pub async fn handle_wallets(project_location: &ProjectLocation) -> Result<(), WalletsError> {
    let config = project_location.setup_config(false)?;

    let provider = EvmProvider::new(
        &config.provider_urls,
        config.chain_id,
        config.submission.receipt_poll_interval(),
    )
    .await?;

    let signers = signers_from_keys(&config.signing_keys)?;
    let minimum = config.wallet_pool.min_balance;

    let mut rows = Vec::with_capacity(signers.len());
    let mut underfunded = Vec::new();
    for (index, signer) in signers.iter().enumerate() {
        let address = signer_address(signer);
        let balance = provider.get_balance(&address).await?;
        let nonce = provider.get_transaction_count(&address).await?;

        if balance < minimum {
            underfunded.push(address);
        }

        rows.push(vec![
            index.to_string(),
            address.to_string(),
            format!("{} ETH", format_ether(balance)),
            nonce.to_string(),
        ]);
    }

    print_table(
        vec!["#", "Address", "Balance", "Nonce"],
        rows,
        Some(&format!("Relay wallets for {} on chain {}", config.name, provider.chain_id)),
    );

    for address in underfunded {
        print_warn_message(&format!(
            "{} is below the minimum balance of {} ETH and will not be selected",
            address,
            format_ether(minimum)
        ));
    }

    Ok(())
}
