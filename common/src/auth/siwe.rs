// common/src/auth/siwe.rs
//! EIP-4361 (Sign-In with Ethereum) message parsing and rendering.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::errors::SiweError;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const RESOURCES_TAG: &str = "Resources:";

/// A parsed EIP-4361 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: String,
    pub statement: Option<String>,
    pub uri: Option<String>,
    pub version: Option<String>,
    pub chain_id: u64,
    pub nonce: Option<String>,
    pub issued_at: Option<String>,
    pub expiration_time: Option<String>,
    pub not_before: Option<String>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    pub fn new(domain: impl Into<String>, address: impl Into<String>, chain_id: u64) -> Self {
        Self {
            domain: domain.into(),
            address: address.into(),
            statement: None,
            uri: None,
            version: Some("1".to_string()),
            chain_id,
            nonce: None,
            issued_at: None,
            expiration_time: None,
            not_before: None,
            request_id: None,
            resources: Vec::new(),
        }
    }

    /// Reject a message outside its `Not Before` / `Expiration Time` window.
    ///
    /// Absent bounds are open-ended. Unparseable bounds fail closed.
    pub fn check_time(&self, now: DateTime<Utc>) -> Result<(), SiweError> {
        if let Some(expiration_time) = &self.expiration_time {
            if parse_timestamp(expiration_time)? <= now {
                return Err(SiweError::Expired(expiration_time.clone()));
            }
        }
        if let Some(not_before) = &self.not_before {
            if parse_timestamp(not_before)? > now {
                return Err(SiweError::NotYetValid(not_before.clone()));
            }
        }
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, SiweError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| SiweError::Timestamp(value.to_string()))
}

/// `0x` followed by 40 hex digits. Checksum casing is not enforced.
pub fn is_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

impl FromStr for SiweMessage {
    type Err = SiweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines();

        let domain = lines
            .next()
            .and_then(|line| line.strip_suffix(HEADER_SUFFIX))
            .filter(|domain| !domain.is_empty())
            .ok_or(SiweError::Header)?;

        let address = lines.next().unwrap_or_default().trim();
        if !is_address(address) {
            return Err(SiweError::Address(address.to_string()));
        }

        let mut message = SiweMessage::new(domain, address, 0);
        message.version = None;

        let mut chain_id = None;
        let mut seen_tag = false;
        let mut in_resources = false;

        for line in lines {
            if in_resources {
                match line.strip_prefix("- ") {
                    Some(resource) => {
                        message.resources.push(resource.to_string());
                        continue;
                    }
                    None => return Err(SiweError::UnexpectedLine(line.to_string())),
                }
            }

            if line.is_empty() {
                continue;
            }

            if line == RESOURCES_TAG {
                in_resources = true;
                seen_tag = true;
                continue;
            }

            let tagged = line.split_once(": ").and_then(|(key, value)| {
                let value = value.to_string();
                match key {
                    "URI" => Some(Tag::Uri(value)),
                    "Version" => Some(Tag::Version(value)),
                    "Chain ID" => Some(Tag::ChainId(value)),
                    "Nonce" => Some(Tag::Nonce(value)),
                    "Issued At" => Some(Tag::IssuedAt(value)),
                    "Expiration Time" => Some(Tag::ExpirationTime(value)),
                    "Not Before" => Some(Tag::NotBefore(value)),
                    "Request ID" => Some(Tag::RequestId(value)),
                    _ => None,
                }
            });

            match tagged {
                Some(Tag::ChainId(value)) => {
                    let parsed = value
                        .parse::<u64>()
                        .map_err(|_| SiweError::ChainId(value.clone()))?;
                    chain_id = Some(parsed);
                }
                Some(Tag::Uri(value)) => message.uri = Some(value),
                Some(Tag::Version(value)) => message.version = Some(value),
                Some(Tag::Nonce(value)) => message.nonce = Some(value),
                Some(Tag::IssuedAt(value)) => message.issued_at = Some(value),
                Some(Tag::ExpirationTime(value)) => message.expiration_time = Some(value),
                Some(Tag::NotBefore(value)) => message.not_before = Some(value),
                Some(Tag::RequestId(value)) => message.request_id = Some(value),
                // The statement is the only free-form line and precedes all tags
                None if !seen_tag && message.statement.is_none() => {
                    message.statement = Some(line.to_string());
                    continue;
                }
                None => return Err(SiweError::UnexpectedLine(line.to_string())),
            }
            seen_tag = true;
        }

        message.chain_id = chain_id.ok_or(SiweError::MissingChainId)?;
        Ok(message)
    }
}

enum Tag {
    Uri(String),
    Version(String),
    ChainId(String),
    Nonce(String),
    IssuedAt(String),
    ExpirationTime(String),
    NotBefore(String),
    RequestId(String),
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}", self.domain, HEADER_SUFFIX)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{}", statement)?;
            writeln!(f)?;
        }

        let mut fields = Vec::new();
        if let Some(uri) = &self.uri {
            fields.push(format!("URI: {}", uri));
        }
        if let Some(version) = &self.version {
            fields.push(format!("Version: {}", version));
        }
        fields.push(format!("Chain ID: {}", self.chain_id));
        if let Some(nonce) = &self.nonce {
            fields.push(format!("Nonce: {}", nonce));
        }
        if let Some(issued_at) = &self.issued_at {
            fields.push(format!("Issued At: {}", issued_at));
        }
        if let Some(expiration_time) = &self.expiration_time {
            fields.push(format!("Expiration Time: {}", expiration_time));
        }
        if let Some(not_before) = &self.not_before {
            fields.push(format!("Not Before: {}", not_before));
        }
        if let Some(request_id) = &self.request_id {
            fields.push(format!("Request ID: {}", request_id));
        }
        if !self.resources.is_empty() {
            fields.push(RESOURCES_TAG.to_string());
            for resource in &self.resources {
                fields.push(format!("- {}", resource));
            }
        }

        write!(f, "{}", fields.join("\n"))
    }
}
