//! Payload codecs
//!
//! A codec only moves bytes into and out of the intermediate tree; all type
//! knowledge stays in the mapper.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::config::Protocol;
use crate::error::{HandlerError, Result};
use std::fmt;
use structbridge_core::Node;

/// Conversion between payload bytes and the intermediate tree
pub trait PayloadCodec: fmt::Debug + Send + Sync {
    fn protocol(&self) -> Protocol;

    fn decode(&self, payload: &[u8]) -> Result<Node>;

    fn encode(&self, node: &Node) -> Result<Vec<u8>>;
}

/// JSON codec; pretty output for [`Protocol::Json`], compact otherwise
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl PayloadCodec for JsonCodec {
    fn protocol(&self) -> Protocol {
        if self.pretty {
            Protocol::Json
        } else {
            Protocol::SimpleJson
        }
    }

    fn decode(&self, payload: &[u8]) -> Result<Node> {
        serde_json::from_slice(payload).map_err(|source| HandlerError::Deserialization {
            protocol: self.protocol(),
            source,
        })
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(node)
        } else {
            serde_json::to_vec(node)
        };
        encoded.map_err(|source| HandlerError::Serialization {
            protocol: self.protocol(),
            source,
        })
    }
}

/// Codec for `protocol`
///
/// Binary and compact framings depend on generated per-type code and have no
/// generic codec.
pub fn codec_for(protocol: Protocol) -> Result<Box<dyn PayloadCodec>> {
    match protocol {
        Protocol::Json => Ok(Box::new(JsonCodec::pretty())),
        Protocol::SimpleJson => Ok(Box::new(JsonCodec::compact())),
        Protocol::Binary | Protocol::Compact => Err(structbridge_core::Error::unsupported(
            format!("no generic codec for the {} protocol", protocol),
            Some(protocol.as_str()),
        )
        .into()),
    }
}
