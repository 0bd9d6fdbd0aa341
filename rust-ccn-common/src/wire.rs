//! Wire encoding and decoding of packets.
//!
//! Layout, all integers little-endian:
//!
//! * byte 0: packet type, OR'd with [`MARK_BIT`] when marked
//! * u16: rate signal
//! * Interest: u8 interest type, then the name
//! * Data: the name, then u32 content length and that many fill bytes
//!
//! A name is a u32 component count followed by, per component, a u32
//! byte length and the UTF-8 bytes.

use crate::error::Error;
use crate::name::Name;
use crate::packet::{Data, Interest, InterestKind, Packet, PacketType, Payload};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Bit set in the first byte of a marked packet.
pub const MARK_BIT: u8 = 0x80;

/// Type byte plus the rate signal.
pub const HEADER_LEN: usize = 3;

/* ---------------------------------------------------------------- *
 * Encoding
 * ---------------------------------------------------------------- */

/// Encode a packet into a fresh buffer.
pub fn encode(packet: &Packet) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len(packet));
    encode_into(packet, &mut buf);
    buf.freeze()
}

/// Encode a packet, appending to `buf`.
pub fn encode_into(packet: &Packet, buf: &mut BytesMut) {
    let mut type_byte = packet.packet_type() as u8;
    if packet.is_marked() {
        type_byte |= MARK_BIT;
    }
    buf.put_u8(type_byte);
    buf.put_u16_le(packet.rate_signal());

    match packet.payload() {
        Payload::Interest(interest) => {
            buf.put_u8(interest.kind.to_byte());
            encode_name(&interest.name, buf);
        }
        Payload::Data(data) => {
            encode_name(&data.name, buf);
            buf.put_u32_le(data.content_len);
            buf.put_bytes(0, data.content_len as usize);
        }
    }
}

/// Encode a name, appending to `buf`.
pub fn encode_name(name: &Name, buf: &mut BytesMut) {
    buf.put_u32_le(name.len() as u32);
    for component in name.components() {
        buf.put_u32_le(component.len() as u32);
        buf.extend_from_slice(component.as_bytes());
    }
}

/// Number of bytes `name` occupies on the wire.
pub fn name_len(name: &Name) -> usize {
    4 + name.components().iter().map(|c| 4 + c.len()).sum::<usize>()
}

/// Bytes a Data packet for `name` takes besides its content fill.
pub fn data_overhead(name: &Name) -> usize {
    HEADER_LEN + name_len(name) + 4
}

/// Number of bytes `packet` occupies on the wire.
pub fn encoded_len(packet: &Packet) -> usize {
    match packet.payload() {
        Payload::Interest(interest) => HEADER_LEN + 1 + name_len(&interest.name),
        Payload::Data(data) => data_overhead(&data.name) + data.content_len as usize,
    }
}

/* ---------------------------------------------------------------- *
 * Decoding
 * ---------------------------------------------------------------- */

/// Read the packet type and mark from the first byte without decoding the rest.
pub fn peek_header(bytes: &[u8]) -> Result<(PacketType, bool), Error> {
    let first = *bytes.first().ok_or(Error::Truncated {
        needed: 1,
        remaining: 0,
    })?;
    let packet_type =
        PacketType::from_byte(first & !MARK_BIT).ok_or(Error::UnknownPacketType(first & !MARK_BIT))?;
    Ok((packet_type, first & MARK_BIT == MARK_BIT))
}

/// Decode exactly one packet from `bytes`.
///
/// The whole buffer must be consumed; trailing bytes are a framing error.
pub fn decode(bytes: &[u8]) -> Result<Packet, Error> {
    let (packet_type, marked) = peek_header(bytes)?;
    let mut buf = &bytes[1..];
    ensure(&buf, 2)?;
    let rate_signal = buf.get_u16_le();

    let payload = match packet_type {
        PacketType::Interest => {
            ensure(&buf, 1)?;
            let kind = InterestKind::from_byte(buf.get_u8());
            let name = decode_name(&mut buf)?;
            Payload::Interest(Interest::new(name, kind))
        }
        PacketType::Data => {
            let name = decode_name(&mut buf)?;
            ensure(&buf, 4)?;
            let content_len = buf.get_u32_le();
            ensure(&buf, content_len as usize)?;
            buf.advance(content_len as usize);
            Payload::Data(Data::new(name, content_len))
        }
    };

    if buf.has_remaining() {
        return Err(Error::Malformed(format!(
            "{} trailing bytes after {:?} packet",
            buf.remaining(),
            packet_type
        )));
    }

    Ok(Packet::from_parts(marked, rate_signal, payload))
}

/// Decode a name, advancing `buf` past it.
pub fn decode_name(buf: &mut impl Buf) -> Result<Name, Error> {
    ensure(&*buf, 4)?;
    let count = buf.get_u32_le() as usize;
    // every component needs at least its length prefix
    if count.saturating_mul(4) > buf.remaining() {
        return Err(Error::Malformed(format!(
            "name declares {} components but only {} bytes remain",
            count,
            buf.remaining()
        )));
    }

    let mut components = Vec::with_capacity(count);
    for _ in 0..count {
        ensure(&*buf, 4)?;
        let len = buf.get_u32_le() as usize;
        ensure(&*buf, len)?;
        let raw = buf.copy_to_bytes(len);
        components.push(String::from_utf8(raw.to_vec())?);
    }

    Ok(Name::from_components(components))
}

fn ensure(buf: &impl Buf, needed: usize) -> Result<(), Error> {
    if buf.remaining() < needed {
        return Err(Error::Truncated {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}
