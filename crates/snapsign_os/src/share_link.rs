#![forbid(unsafe_code)]

use std::fmt::Write as _;
use std::io::{Read, Write as _};

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use url::Url;

use snapsign_engines::codec::{CodecError, StateCodec};
use snapsign_kernel_contracts::state::ContractState;
use snapsign_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug)]
pub enum ShareLinkError {
    /// The payload decompressed but is not a structured record.
    MalformedShareData(String),
    /// The link itself, its base64 payload, or the compression transform is
    /// broken. Never yields a partially populated state.
    InvalidShareLink(String),
}

impl std::fmt::Display for ShareLinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedShareData(reason) => write!(f, "malformed share data: {reason}"),
            Self::InvalidShareLink(reason) => write!(f, "invalid share link: {reason}"),
        }
    }
}

impl std::error::Error for ShareLinkError {}

impl From<CodecError> for ShareLinkError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::MalformedShareData(reason) => Self::MalformedShareData(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareLinkConfig {
    /// The single query parameter carrying the whole contract. Its absence
    /// is the authoring-mode signal.
    pub data_param: &'static str,
}

impl ShareLinkConfig {
    pub fn mvp_v1() -> Self {
        Self { data_param: "data" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkBuild {
    pub url: String,
    /// SHA-256 of the compressed payload, hex. Lets an operator compare two
    /// links without opening either; never part of the URL itself.
    pub payload_hash: String,
    pub compressed_len: usize,
}

impl ShareLinkBuild {
    pub fn v1(
        url: String,
        payload_hash: String,
        compressed_len: usize,
    ) -> Result<Self, ContractViolation> {
        let build = Self {
            url,
            payload_hash,
            compressed_len,
        };
        build.validate()?;
        Ok(build)
    }
}

impl Validate for ShareLinkBuild {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.url.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "share_link_build.url",
                reason: "must be non-empty",
            });
        }
        if self.payload_hash.len() != 64
            || !self.payload_hash.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ContractViolation::InvalidValue {
                field: "share_link_build.payload_hash",
                reason: "must be a 64-char hex digest",
            });
        }
        if self.compressed_len == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "share_link_build.compressed_len",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Composes the state codec with the wire transform: compact record ->
/// JSON text -> raw deflate -> URL-safe base64 -> `?data=` parameter.
/// Parsing reverses each step; each stage failure keeps its own error class.
#[derive(Debug, Clone)]
pub struct ShareLinkBuilder {
    config: ShareLinkConfig,
    codec: StateCodec,
}

impl ShareLinkBuilder {
    pub fn new(config: ShareLinkConfig) -> Self {
        Self {
            config,
            codec: StateCodec::new(),
        }
    }

    pub fn build(
        &self,
        state: &ContractState,
        base_url: &str,
    ) -> Result<ShareLinkBuild, ShareLinkError> {
        let record = self.codec.encode(state);
        let json = serde_json::to_string(&record)
            .map_err(|err| ShareLinkError::InvalidShareLink(format!("payload encode: {err}")))?;

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(json.as_bytes())
            .map_err(|err| ShareLinkError::InvalidShareLink(format!("compression: {err}")))?;
        let compressed = encoder
            .finish()
            .map_err(|err| ShareLinkError::InvalidShareLink(format!("compression: {err}")))?;

        let payload = BASE64_URL.encode(&compressed);
        let mut url = Url::parse(base_url)
            .map_err(|err| ShareLinkError::InvalidShareLink(format!("base url: {err}")))?;
        url.query_pairs_mut()
            .append_pair(self.config.data_param, &payload);

        ShareLinkBuild::v1(url.into(), hex_digest(&compressed), compressed.len()).map_err(
            |violation| {
                ShareLinkError::InvalidShareLink(format!("link build contract: {violation:?}"))
            },
        )
    }

    /// `None` means the link carries no contract payload at all: the
    /// consumer is authoring, not receiving.
    pub fn parse(&self, link: &str) -> Result<Option<ContractState>, ShareLinkError> {
        let url = Url::parse(link)
            .map_err(|err| ShareLinkError::InvalidShareLink(format!("link parse: {err}")))?;

        let Some(payload) = url
            .query_pairs()
            .find(|(key, _)| key == self.config.data_param)
            .map(|(_, value)| value.into_owned())
        else {
            return Ok(None);
        };

        let compressed = BASE64_URL
            .decode(payload.as_bytes())
            .map_err(|err| ShareLinkError::InvalidShareLink(format!("base64: {err}")))?;

        let mut json = String::new();
        DeflateDecoder::new(compressed.as_slice())
            .read_to_string(&mut json)
            .map_err(|err| ShareLinkError::InvalidShareLink(format!("decompression: {err}")))?;

        let payload: serde_json::Value = serde_json::from_str(&json)
            .map_err(|err| ShareLinkError::MalformedShareData(format!("record parse: {err}")))?;

        let state = self.codec.decode(&payload)?;
        Ok(Some(state))
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
