//! Data handler entry point
//!
//! [`DataHandler`] ties a payload codec to a [`Mapper`]: decoding turns a
//! payload into a Source instance and then into a Target record, encoding
//! runs the same path backwards. Empty payloads are treated as null input and
//! follow the configured null-handling strategy.
//!
//! Copyright (c) 2025 Structbridge Team
//! Licensed under the Apache-2.0 license

use crate::codec::{codec_for, PayloadCodec};
use crate::config::HandlerConfig;
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufReader, Read};
use structbridge_core::{CacheStats, Describable, DynamicRecord, Mapper, NullOutcome};
use tracing::{debug, instrument};

/// Path reported when the whole payload is null
const ROOT_PATH: &str = "$";

#[derive(Debug)]
pub struct DataHandler {
    config: HandlerConfig,
    binding_context: HashMap<String, Value>,
    mapper: Mapper,
    codec: Box<dyn PayloadCodec>,
}

impl DataHandler {
    /// Build a handler; fails for invalid settings or a protocol without a
    /// generic codec
    pub fn new(config: HandlerConfig) -> Result<Self> {
        config.validate()?;
        let codec = codec_for(config.protocol)?;
        Ok(Self {
            binding_context: config.to_binding_context(),
            mapper: Mapper::new(config.policy.clone()),
            codec,
            config,
        })
    }

    pub fn from_binding_context(context: HashMap<String, Value>) -> Result<Self> {
        let mut handler = Self::new(HandlerConfig::from_binding_context(&context))?;
        handler.binding_context = context;
        Ok(handler)
    }

    /// Replace the binding context
    ///
    /// The mapper is rebuilt, so every cached descriptor and schema is
    /// dropped. On error the handler keeps its previous settings.
    pub fn set_binding_context(&mut self, context: HashMap<String, Value>) -> Result<()> {
        let config = HandlerConfig::from_binding_context(&context);
        config.validate()?;
        let codec = codec_for(config.protocol)?;

        debug!(protocol = %config.protocol, null_handling = %config.policy.null_handling, "Binding context updated");
        self.mapper = Mapper::new(config.policy.clone());
        self.codec = codec;
        self.config = config;
        self.binding_context = context;
        Ok(())
    }

    pub fn binding_context(&self) -> &HashMap<String, Value> {
        &self.binding_context
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Decode a payload into a Target record for `R`
    ///
    /// Returns `None` when the payload is empty or null and the policy is
    /// `preserve` or `omit`.
    #[instrument(skip(self, payload), fields(type_name = R::TYPE_NAME, bytes = payload.len()))]
    pub fn decode<R: Describable>(&self, payload: &[u8]) -> Result<Option<DynamicRecord>> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return self.null_payload::<R>();
        }

        let node = self.codec.decode(payload)?;
        if node.is_null() {
            return self.null_payload::<R>();
        }

        let source: R = self.mapper.node_to_source(&node)?;
        let target = self.mapper.to_target(&source)?;
        debug!(slots = target.set_count(), "Decoded payload");
        Ok(Some(target))
    }

    pub fn decode_str<R: Describable>(&self, payload: &str) -> Result<Option<DynamicRecord>> {
        self.decode::<R>(payload.as_bytes())
    }

    /// Read the whole of `reader` through a buffer of the configured size and
    /// decode it
    pub fn decode_reader<R: Describable>(&self, reader: impl Read) -> Result<Option<DynamicRecord>> {
        let mut reader = BufReader::with_capacity(self.config.buffer_size, reader);
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        self.decode::<R>(&payload)
    }

    /// Encode a Target record as an `R` payload
    #[instrument(skip(self, target), fields(type_name = R::TYPE_NAME, schema = target.schema().name()))]
    pub fn encode<R: Describable>(&self, target: &DynamicRecord) -> Result<Vec<u8>> {
        let source: R = self.mapper.to_source(target)?;
        let node = self.mapper.source_to_node(&source)?;
        let payload = self.codec.encode(&node)?;
        debug!(bytes = payload.len(), "Encoded payload");
        Ok(payload)
    }

    /// Decode `payload` and copy its set slots into `target`
    ///
    /// Returns the number of slots copied; a null payload that decodes to
    /// nothing copies none.
    pub fn transform_into<R: Describable>(
        &self,
        payload: &[u8],
        target: &mut DynamicRecord,
    ) -> Result<usize> {
        match self.decode::<R>(payload)? {
            Some(decoded) => Ok(target.merge_from(&decoded)?),
            None => Ok(0),
        }
    }

    pub fn clear_caches(&self) {
        self.mapper.clear_caches();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.mapper.cache_stats()
    }

    pub fn validate_configuration(&self) -> Result<()> {
        self.config.validate()
    }

    fn null_payload<R: Describable>(&self) -> Result<Option<DynamicRecord>> {
        match self.config.policy.resolve_null(R::TYPE_NAME, ROOT_PATH)? {
            NullOutcome::ZeroValue => Ok(Some(self.mapper.to_target(&R::default())?)),
            NullOutcome::ExplicitNull | NullOutcome::Skip => {
                debug!(type_name = R::TYPE_NAME, "Null payload");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use structbridge_core::{FieldDecl, Node, NullHandling, SourceField, SourceValue};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Ping {
        seq: i32,
    }

    impl Describable for Ping {
        const TYPE_NAME: &'static str = "test.Ping";

        fn describe() -> Vec<FieldDecl> {
            vec![FieldDecl::required::<i32>("seq")]
        }

        fn field(&self, name: &str) -> Option<SourceValue> {
            (name == "seq").then(|| SourceValue::I32(self.seq))
        }

        fn set_field(
            &mut self,
            _name: &str,
            value: Option<SourceValue>,
        ) -> structbridge_core::Result<()> {
            self.seq = i32::from_source(value)?;
            Ok(())
        }
    }

    fn handler(null_handling: NullHandling) -> DataHandler {
        let policy = structbridge_core::MappingPolicy::new().with_null_handling(null_handling);
        DataHandler::new(HandlerConfig::default().with_policy(policy)).unwrap()
    }

    #[test]
    fn test_decode_and_encode() {
        let handler = handler(NullHandling::Preserve);
        let target = handler.decode_str::<Ping>(r#"{"seq": 3}"#).unwrap().unwrap();
        assert_eq!(target.get("seq").and_then(|v| v.as_i64()), Some(3));

        let payload = handler.encode::<Ping>(&target).unwrap();
        let node: Node = serde_json::from_slice(&payload).unwrap();
        assert_eq!(node.get("seq"), Some(&Node::Int(3)));
    }

    #[test]
    fn test_null_payload_follows_policy() {
        assert!(handler(NullHandling::Preserve).decode::<Ping>(b"").unwrap().is_none());
        assert!(handler(NullHandling::Omit).decode::<Ping>(b" \n").unwrap().is_none());
        assert!(handler(NullHandling::Preserve).decode::<Ping>(b"null").unwrap().is_none());

        let zero = handler(NullHandling::Default).decode::<Ping>(b"").unwrap().unwrap();
        assert_eq!(zero.get("seq").and_then(|v| v.as_i64()), Some(0));

        let err = handler(NullHandling::Error).decode::<Ping>(b"  ").unwrap_err();
        assert_eq!(err.code(), "NULL_INPUT_ERROR");
    }

    #[test]
    fn test_unsupported_protocol_rejected_at_construction() {
        let config = HandlerConfig::default().with_protocol(Protocol::Compact);
        let err = DataHandler::new(config).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_OPERATION");
    }
}
