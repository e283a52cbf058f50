// common/src/auth/verifier.rs
use std::time::Duration;

use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::Deserialize;
use serde_json::json;
use sha3::{Digest, Keccak256};
use url::Url;

use super::errors::VerifyError;

/// `isValidSignature(bytes32,bytes)` selector, also the ERC-1271 success value
const ERC1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Inputs to a single signature check
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub address: &'a str,
    pub message: &'a str,
    pub signature: &'a str,
    pub chain_id: u64,
    pub project_id: &'a str,
}

/// Decides whether `signature` was produced by `address` over `message`
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, request: &VerificationRequest<'_>) -> Result<bool, VerifyError>;
}

/// Hash signed by `personal_sign` (EIP-191 version 0x45)
pub fn personal_sign_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Lowercase `0x` address derived from a secp256k1 public key
pub fn address_from_key(key: &VerifyingKey) -> String {
    let encoded = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let digest = Keccak256::digest(&encoded.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

fn decode_hex(value: &str) -> Result<Vec<u8>, VerifyError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(hex::decode(digits)?)
}

fn normalize_recovery_id(raw: u8) -> Result<RecoveryId, VerifyError> {
    let id = match raw {
        27 | 28 => raw - 27,
        0 | 1 => raw,
        _ => return Err(VerifyError::RecoveryId(raw)),
    };
    RecoveryId::from_byte(id).ok_or(VerifyError::RecoveryId(raw))
}

/// Recover the signer of an EIP-191 personal message from a 65-byte `r || s || v` signature
pub fn recover_address(message: &str, signature: &str) -> Result<String, VerifyError> {
    let bytes = decode_hex(signature)?;
    if bytes.len() != 65 {
        return Err(VerifyError::SignatureLength(bytes.len()));
    }

    let sig = Signature::try_from(&bytes[..64])
        .map_err(|e| VerifyError::Signature(e.to_string()))?;
    let recovery_id = normalize_recovery_id(bytes[64])?;
    let prehash = personal_sign_hash(message);
    let key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|e| VerifyError::Recovery(e.to_string()))?;

    Ok(address_from_key(&key))
}

/// Externally owned accounts: local ECDSA recovery
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip191Verifier;

#[async_trait]
impl SignatureVerifier for Eip191Verifier {
    async fn verify(&self, request: &VerificationRequest<'_>) -> Result<bool, VerifyError> {
        let recovered = recover_address(request.message, request.signature)?;
        Ok(recovered.eq_ignore_ascii_case(request.address))
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Smart-contract wallets: ERC-1271 `isValidSignature` over JSON-RPC
#[derive(Debug, Clone)]
pub struct Erc1271Verifier {
    client: reqwest::Client,
    rpc_url: Url,
}

impl Erc1271Verifier {
    /// `timeout` bounds the whole RPC exchange, so a stalled node fails the login
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            rpc_url: Url::parse(rpc_url)?,
        })
    }

    /// RPC endpoint for a chain, authenticated with the project id
    pub fn endpoint(&self, chain_id: u64, project_id: &str) -> Url {
        let mut url = self.rpc_url.clone();
        url.query_pairs_mut()
            .append_pair("chainId", &format!("eip155:{}", chain_id))
            .append_pair("projectId", project_id);
        url
    }
}

fn abi_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// ABI-encoded calldata for `isValidSignature(bytes32 hash, bytes signature)`
pub fn encode_is_valid_signature(hash: &[u8; 32], signature: &[u8]) -> String {
    let padding = (32 - signature.len() % 32) % 32;
    let mut data = Vec::with_capacity(4 + 32 * 3 + signature.len() + padding);
    data.extend_from_slice(&ERC1271_MAGIC_VALUE);
    data.extend_from_slice(hash);
    // Offset of the dynamic `bytes` argument
    data.extend_from_slice(&abi_word(0x40));
    data.extend_from_slice(&abi_word(signature.len() as u64));
    data.extend_from_slice(signature);
    data.resize(data.len() + padding, 0);
    format!("0x{}", hex::encode(data))
}

/// Whether an `eth_call` result carries the ERC-1271 magic value
pub fn is_magic_value(result: &str) -> bool {
    let digits = result.strip_prefix("0x").unwrap_or(result);
    digits
        .get(..8)
        .map(|prefix| prefix.eq_ignore_ascii_case(&hex::encode(ERC1271_MAGIC_VALUE)))
        .unwrap_or(false)
}

#[async_trait]
impl SignatureVerifier for Erc1271Verifier {
    async fn verify(&self, request: &VerificationRequest<'_>) -> Result<bool, VerifyError> {
        let signature = decode_hex(request.signature)?;
        let hash = personal_sign_hash(request.message);
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": request.address,
                    "data": encode_is_valid_signature(&hash, &signature),
                },
                "latest"
            ]
        });

        let response: RpcResponse = self
            .client
            .post(self.endpoint(request.chain_id, request.project_id))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response {
            RpcResponse { result: Some(result), .. } => Ok(is_magic_value(&result)),
            RpcResponse { error: Some(error), .. } => Err(VerifyError::Rpc {
                code: error.code,
                message: error.message,
            }),
            _ => Err(VerifyError::EmptyResponse),
        }
    }
}

/// Local EIP-191 recovery first, ERC-1271 over RPC when that does not succeed
#[derive(Debug, Clone)]
pub struct ChainedVerifier {
    local: Eip191Verifier,
    remote: Erc1271Verifier,
}

impl ChainedVerifier {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, VerifyError> {
        Ok(Self {
            local: Eip191Verifier,
            remote: Erc1271Verifier::new(rpc_url, timeout)?,
        })
    }
}

#[async_trait]
impl SignatureVerifier for ChainedVerifier {
    async fn verify(&self, request: &VerificationRequest<'_>) -> Result<bool, VerifyError> {
        match self.local.verify(request).await {
            Ok(true) => return Ok(true),
            Ok(false) => tracing::debug!(
                "Recovered signer differs from {}, trying ERC-1271",
                request.address
            ),
            Err(e) => tracing::debug!("Local signature check failed ({}), trying ERC-1271", e),
        }

        self.remote.verify(request).await
    }
}
