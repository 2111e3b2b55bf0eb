//! # JSON <-> Protobuf Codec
//!
//! An implementation of `tonic::codec::Codec` that lets `tonic` transport
//! `serde_json::Value` directly, with no generated Rust structs involved.
//!
//! * The encoder validates a JSON value against a `MessageDescriptor` through
//!   `prost_reflect::DynamicMessage` and writes the resulting Protobuf bytes.
//!   Fields present in the JSON but absent from the schema are ignored, and
//!   schema fields absent from the JSON keep their zero value, so documents
//!   assembled from URL parameters may safely carry extra keys.
//! * The decoder reads wire bytes into a `DynamicMessage` and renders it back
//!   to a JSON value following the proto3 JSON mapping.
use prost::Message;
use prost_reflect::{DeserializeOptions, DynamicMessage, MessageDescriptor};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A codec bridging `serde_json::Value` and the Protobuf binary format.
pub struct JsonCodec {
    /// Schema of messages written to the wire.
    encode: MessageDescriptor,
    /// Schema of messages read from the wire.
    decode: MessageDescriptor,
}

impl JsonCodec {
    /// Creates a new `JsonCodec`.
    ///
    /// A client passes the method's input descriptor as `encode` and its
    /// output descriptor as `decode`; a server passes the reverse.
    pub fn new(encode: MessageDescriptor, decode: MessageDescriptor) -> Self {
        Self { encode, decode }
    }
}

impl Codec for JsonCodec {
    type Encode = serde_json::Value;
    type Decode = serde_json::Value;

    type Encoder = JsonEncoder;
    type Decoder = JsonDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        JsonEncoder(self.encode.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        JsonDecoder(self.decode.clone())
    }
}

/// Encodes a JSON value into Protobuf bytes.
pub struct JsonEncoder(MessageDescriptor);

impl Encoder for JsonEncoder {
    type Item = serde_json::Value;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        // serde_json::Value is itself a Deserializer, so it can be fed to
        // DynamicMessage directly. Unknown fields are dropped rather than
        // rejected; the document side does not know the schema.
        let options = DeserializeOptions::new().deny_unknown_fields(false);
        let message = DynamicMessage::deserialize_with_options(self.0.clone(), item, &options)
            .map_err(|e| {
                Status::invalid_argument(format!("request does not match the method schema: {e}"))
            })?;

        message.encode_raw(dst);
        Ok(())
    }
}

/// Decodes Protobuf bytes into a JSON value.
pub struct JsonDecoder(MessageDescriptor);

impl Decoder for JsonDecoder {
    type Item = serde_json::Value;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut message = DynamicMessage::new(self.0.clone());
        message
            .merge(src)
            .map_err(|e| Status::internal(format!("failed to decode message bytes: {e}")))?;

        let value = serde_json::to_value(&message)
            .map_err(|e| Status::internal(format!("failed to render message as JSON: {e}")))?;

        Ok(Some(value))
    }
}
