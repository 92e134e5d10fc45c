//! Startup-time decryption of the endpoint and token.

use anyhow::{anyhow, Context, Result};
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::Client as KmsClient;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::info;

use crate::config::Config;

/// Resolves the endpoint and token in place. Outside the managed
/// environment (or with encryption off) the raw values pass through.
/// Runs once at startup; any failure here is fatal.
pub async fn resolve_secrets(cfg: &mut Config) -> Result<()> {
    if !cfg.use_encryption {
        info!("skipping parameter decryption");
        return Ok(());
    }

    let aws_cfg = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let client = KmsClient::new(&aws_cfg);

    cfg.endpoint = decrypt(&client, &cfg.endpoint, &cfg.function_name)
        .await
        .context("decrypting endpoint")?;
    cfg.api_token = decrypt(&client, &cfg.api_token, &cfg.function_name)
        .await
        .context("decrypting api token")?;

    Ok(())
}

/// Base64-decodes the ciphertext and decrypts it with the function name
/// bound into the encryption context.
async fn decrypt(client: &KmsClient, encrypted: &str, function_name: &str) -> Result<String> {
    let decoded = STANDARD
        .decode(encrypted)
        .context("decoding encrypted parameter as base64")?;

    let response = client
        .decrypt()
        .ciphertext_blob(Blob::new(decoded))
        .encryption_context("LambdaFunctionName", function_name)
        .send()
        .await
        .context("KMS decrypt call")?;

    let plaintext = response
        .plaintext()
        .ok_or_else(|| anyhow!("KMS response carried no plaintext"))?;

    String::from_utf8(plaintext.as_ref().to_vec()).context("decrypted parameter is not UTF-8")
}
