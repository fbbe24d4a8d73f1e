//! Length-delimited framing for stream transports.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::message::{DataMessage, OlsrPacket};

/// Frames control packets.
pub struct PacketCodec {
    codec: LengthDelimitedCodec,
}

impl PacketCodec {
    pub fn new() -> Self {
        Self {
            codec: LengthDelimitedCodec::new(),
        }
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = OlsrPacket;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let bytes = match self.codec.decode(src)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        match OlsrPacket::decode(&bytes) {
            Ok(packet) => Ok(Some(packet)),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}

impl Encoder<OlsrPacket> for PacketCodec {
    type Error = io::Error;

    fn encode(&mut self, packet: OlsrPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match packet.encode() {
            Ok(bytes) => self.codec.encode(bytes, dst),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}

/// Frames overlay data messages.
pub struct DataCodec {
    codec: LengthDelimitedCodec,
}

impl DataCodec {
    pub fn new() -> Self {
        Self {
            codec: LengthDelimitedCodec::new(),
        }
    }
}

impl Default for DataCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DataCodec {
    type Item = DataMessage;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let bytes = match self.codec.decode(src)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        match DataMessage::decode(&bytes) {
            Ok(message) => Ok(Some(message)),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
}

impl Encoder<DataMessage> for DataCodec {
    type Error = io::Error;

    fn encode(&mut self, message: DataMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match message.encode() {
            Ok(bytes) => self.codec.encode(bytes, dst),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}
