//! The fixed 36 byte header that starts every LIFX packet, and the little-endian field readers and
//! writers used to pack payloads.
//!
//! Every multi-byte field is read and written one field at a time through `byteorder`, so nothing
//! here depends on the host's byte order or alignment.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::{Cursor, Read};

use crate::message::Message;
use crate::types::{Blob, Guid, Label, Service, Waveform, HSBK};
use crate::Error;

/// Size of the frame, frame address and protocol header together.
pub const HEADER_SIZE: usize = 36;

/// Payload bytes kept from an incoming datagram.  Anything past this is dropped.
pub const MAX_PAYLOAD_SIZE: usize = 128;

/// Datagrams larger than this are rejected without being decoded.
pub const MAX_DATAGRAM_SIZE: usize = 512;

/// The UDP port every LIFX device listens on.
pub const LIFX_PORT: u16 = 56700;

/// Protocol number carried in the frame: must be 1024
pub const PROTOCOL_NUMBER: u16 = 1024;

/// Added to every nanosecond timestamp a real bulb reports.
pub const MAGIC_OFFSET: u64 = 614_500;

/// Site field of every outgoing packet; spells out "LIFXV2".
pub const SITE: [u8; 6] = [0x4C, 0x49, 0x46, 0x58, 0x56, 0x32];

/// Converts wall clock seconds into the nanosecond timestamp format real bulbs use, magic offset
/// included.
pub fn header_timestamp(seconds: u64) -> u64 {
    seconds
        .wrapping_mul(1_000_000_000)
        .wrapping_add(MAGIC_OFFSET)
}

pub(crate) trait LittleEndianWriter<T>: WriteBytesExt {
    fn write_val(&mut self, v: T) -> Result<(), io::Error>;
}

macro_rules! derive_writer {
{ $( $m:ident: $t:ty ),*} => {
    $(
        impl<T: WriteBytesExt> LittleEndianWriter<$t> for T {
            fn write_val(&mut self, v: $t) -> Result<(), io::Error> {
                self . $m ::<LittleEndian>(v)
            }
        }
    )*

}
}

derive_writer! { write_u32: u32, write_u16: u16, write_i16: i16, write_u64: u64, write_f32: f32 }

impl<T: WriteBytesExt> LittleEndianWriter<u8> for T {
    fn write_val(&mut self, v: u8) -> Result<(), io::Error> {
        self.write_u8(v)
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<bool> for T {
    fn write_val(&mut self, v: bool) -> Result<(), io::Error> {
        self.write_u8(if v { 1 } else { 0 })
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<[u8; 8]> for T {
    fn write_val(&mut self, v: [u8; 8]) -> Result<(), io::Error> {
        self.write_all(&v)
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<Label> for T {
    fn write_val(&mut self, v: Label) -> Result<(), io::Error> {
        self.write_all(&v.0)
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<Guid> for T {
    fn write_val(&mut self, v: Guid) -> Result<(), io::Error> {
        self.write_all(&v.to_wire())
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<Blob> for T {
    fn write_val(&mut self, v: Blob) -> Result<(), io::Error> {
        self.write_all(&v.0)
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<HSBK> for T {
    fn write_val(&mut self, v: HSBK) -> Result<(), io::Error> {
        self.write_val(v.hue)?;
        self.write_val(v.saturation)?;
        self.write_val(v.brightness)?;
        self.write_val(v.kelvin)?;
        Ok(())
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<Service> for T {
    fn write_val(&mut self, v: Service) -> Result<(), io::Error> {
        self.write_u8(v as u8)
    }
}

impl<T: WriteBytesExt> LittleEndianWriter<Waveform> for T {
    fn write_val(&mut self, v: Waveform) -> Result<(), io::Error> {
        self.write_u8(v as u8)
    }
}

pub(crate) trait LittleEndianReader<T> {
    fn read_val(&mut self) -> Result<T, io::Error>;
}

macro_rules! derive_reader {
{ $( $m:ident: $t:ty ),*} => {
    $(
        impl<T: ReadBytesExt> LittleEndianReader<$t> for T {
            fn read_val(&mut self) -> Result<$t, io::Error> {
                self . $m ::<LittleEndian>()
            }
        }
    )*

}
}

derive_reader! { read_u32: u32, read_u16: u16, read_i16: i16, read_u64: u64, read_f32: f32 }

impl<R: ReadBytesExt> LittleEndianReader<u8> for R {
    fn read_val(&mut self) -> Result<u8, io::Error> {
        self.read_u8()
    }
}

impl<R: ReadBytesExt> LittleEndianReader<[u8; 8]> for R {
    fn read_val(&mut self) -> Result<[u8; 8], io::Error> {
        let mut val = [0; 8];
        self.read_exact(&mut val)?;
        Ok(val)
    }
}

impl<R: ReadBytesExt> LittleEndianReader<HSBK> for R {
    fn read_val(&mut self) -> Result<HSBK, io::Error> {
        let hue = self.read_val()?;
        let sat = self.read_val()?;
        let bri = self.read_val()?;
        let kel = self.read_val()?;
        Ok(HSBK {
            hue,
            saturation: sat,
            brightness: bri,
            kelvin: kel,
        })
    }
}

impl<R: ReadBytesExt> LittleEndianReader<Guid> for R {
    fn read_val(&mut self) -> Result<Guid, io::Error> {
        let mut val = [0; 16];
        self.read_exact(&mut val)?;
        Ok(Guid::from_wire(val))
    }
}

impl<R: ReadBytesExt> LittleEndianReader<Label> for R {
    fn read_val(&mut self) -> Result<Label, io::Error> {
        let mut val = [0; 32];
        self.read_exact(&mut val)?;
        Ok(Label(val))
    }
}

/// Blobs take whatever is left of the payload.
impl<R: ReadBytesExt> LittleEndianReader<Blob> for R {
    fn read_val(&mut self) -> Result<Blob, io::Error> {
        let mut val = Vec::new();
        self.read_to_end(&mut val)?;
        Ok(Blob(val))
    }
}

/// The raw message structure
///
/// Contains a low-level protocol info.  This is what is sent and received via UDP packets.
///
/// To parse the payload, use [Message::from_raw].
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub frame: Frame,
    pub frame_addr: FrameAddress,
    pub protocol_header: ProtocolHeader,
    pub payload: Vec<u8>,
}

/// The Frame section contains information about the following:
///
/// * Size of the entire message
/// * LIFX Protocol number: must be 1024 (decimal)
/// * Use of the Frame Address target field
/// * Source identifier
///
/// The `tagged` field is a boolean that indicates whether the Frame Address target field is
/// being used to address an individual device or all devices.  If `tagged` is true, then the
/// `target` field should be all zeros.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// 16 bits: Size of entire message in bytes including this field
    pub size: u16,

    /// 2 bits: Message origin indicator.  Clients send zero; bulbs answer with one.
    pub origin: u8,

    /// 1 bit: Determines usage of the Frame Address target field
    pub tagged: bool,

    /// 1 bit: Message includes a target address: must be one (1)
    pub addressable: bool,

    /// 12 bits: Protocol number: must be 1024 (decimal)
    pub protocol: u16,

    /// 32 bits: Source identifier: unique value set by the client, used by responses.
    ///
    /// Replies carry the same source value as the request they answer.
    pub source: u32,
}

/// The Frame Address section contains the following routing information:
///
/// * Target device address
/// * Site
/// * Acknowledgement message is required flag
/// * State response message is required flag
/// * Message sequence number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAddress {
    /// 48 bits: device address (MAC address) or zero (0) means all devices
    pub target: [u8; 6],

    /// 16 bits: padding after the MAC
    pub reserved: [u8; 2],

    /// 48 bits: site.  Bulbs fill this with "LIFXV2"
    pub site: [u8; 6],

    /// 6 bits: Reserved.  Some apps set the lowest of these; nobody knows what it means.
    pub reserved2: u8,

    /// 1 bit: Acknowledgement message required
    pub ack_required: bool,

    /// 1 bit: Response message required
    pub res_required: bool,

    /// 8 bits: Wrap around message sequence number
    pub sequence: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolHeader {
    /// 64 bits: Reserved.  Bulbs put a nanosecond timestamp here (see [header_timestamp]).
    pub reserved: u64,

    /// 16 bits: Message type determines the payload being used
    pub typ: u16,

    /// 16 bits: Reserved
    pub reserved2: u16,
}

impl Frame {
    /// packed sized, in bytes
    fn packed_size() -> usize {
        8
    }

    /// origin + tagged + addressable + protocol, as they appear in bytes 2-3
    pub fn protocol_word(&self) -> u16 {
        let mut d: u16 = (<u16 as From<u8>>::from(self.origin) & 0b11) << 14;
        d += if self.tagged { 1 } else { 0 } << 13;
        d += if self.addressable { 1 } else { 0 } << 12;
        d += self.protocol & 0b1111_1111_1111;
        d
    }

    fn pack(&self) -> Result<Vec<u8>, Error> {
        let mut v = Vec::with_capacity(Self::packed_size());

        v.write_u16::<LittleEndian>(self.size)?;
        v.write_u16::<LittleEndian>(self.protocol_word())?;
        v.write_u32::<LittleEndian>(self.source)?;

        Ok(v)
    }

    fn unpack(v: &[u8]) -> Result<Frame, Error> {
        let mut c = Cursor::new(v);

        let size = c.read_val()?;

        // origin + tagged + addressable + protocol
        let d: u16 = c.read_val()?;

        let origin: u8 = ((d & 0b1100_0000_0000_0000) >> 14) as u8;
        let tagged: bool = (d & 0b0010_0000_0000_0000) > 0;
        let addressable = (d & 0b0001_0000_0000_0000) > 0;
        let protocol: u16 = d & 0b0000_1111_1111_1111;

        let source = c.read_val()?;

        Ok(Frame {
            size,
            origin,
            tagged,
            addressable,
            protocol,
            source,
        })
    }
}

impl FrameAddress {
    fn packed_size() -> usize {
        16
    }

    /// The flags byte: res_required in bit 0, ack_required in bit 1, reserved above.
    pub fn flags(&self) -> u8 {
        (self.reserved2 << 2)
            + if self.ack_required { 2 } else { 0 }
            + if self.res_required { 1 } else { 0 }
    }

    fn pack(&self) -> Result<Vec<u8>, Error> {
        let mut v = Vec::with_capacity(Self::packed_size());
        v.extend_from_slice(&self.target);
        v.extend_from_slice(&self.reserved);
        v.extend_from_slice(&self.site);
        v.write_u8(self.flags())?;
        v.write_u8(self.sequence)?;
        Ok(v)
    }

    fn unpack(v: &[u8]) -> Result<FrameAddress, Error> {
        let mut c = Cursor::new(v);

        let mut target = [0; 6];
        c.read_exact(&mut target)?;
        let mut reserved = [0; 2];
        c.read_exact(&mut reserved)?;
        let mut site = [0; 6];
        c.read_exact(&mut site)?;

        let b: u8 = c.read_val()?;
        let reserved2: u8 = (b & 0b1111_1100) >> 2;
        let ack_required = (b & 0b10) > 0;
        let res_required = (b & 0b01) > 0;

        let sequence = c.read_val()?;

        Ok(FrameAddress {
            target,
            reserved,
            site,
            reserved2,
            ack_required,
            res_required,
            sequence,
        })
    }
}

impl ProtocolHeader {
    fn packed_size() -> usize {
        12
    }

    /// Packs this part of the packet into some bytes
    pub fn pack(&self) -> Result<Vec<u8>, Error> {
        let mut v = Vec::with_capacity(Self::packed_size());
        v.write_u64::<LittleEndian>(self.reserved)?;
        v.write_u16::<LittleEndian>(self.typ)?;
        v.write_u16::<LittleEndian>(self.reserved2)?;
        Ok(v)
    }

    fn unpack(v: &[u8]) -> Result<ProtocolHeader, Error> {
        let mut c = Cursor::new(v);

        let reserved = c.read_val()?;
        let typ = c.read_val()?;
        let reserved2 = c.read_val()?;

        Ok(ProtocolHeader {
            reserved,
            typ,
            reserved2,
        })
    }
}

/// Options used to contruct a [RawMessage].
///
/// See also [RawMessage::build].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// If not `None`, this is the MAC address of the device sending or receiving the message.
    ///
    /// A message with no target is "tagged", meaning it is addressed to every device.
    pub target: Option<[u8; 6]>,
    /// Site field.  Bulbs use [SITE]; clients leave it zero.
    pub site: [u8; 6],
    /// Origin bits of the frame.  Zero for clients, one for bulb responses.
    pub origin: u8,
    /// Acknowledgement message required.
    pub ack_required: bool,
    /// Response message required.
    pub res_required: bool,
    /// A wrap around sequence number.  Replies copy the sequence of the request.
    pub sequence: u8,
    /// Client identifier.  Replies copy the source of the request.
    pub source: u32,
    /// Protocol header timestamp, see [header_timestamp].
    pub timestamp: u64,
}

impl std::default::Default for BuildOptions {
    fn default() -> BuildOptions {
        BuildOptions {
            target: None,
            site: [0; 6],
            origin: 0,
            ack_required: false,
            res_required: false,
            sequence: 0,
            source: 0,
            timestamp: 0,
        }
    }
}

impl RawMessage {
    /// Build a RawMessage (which is suitable for sending on the network) from a given Message
    /// type.
    pub fn build(options: &BuildOptions, typ: &Message) -> Result<RawMessage, Error> {
        let payload = typ.pack_payload()?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::ProtocolError(format!(
                "payload of {} bytes exceeds {} bytes",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let frame = Frame {
            size: 0,
            origin: options.origin,
            tagged: options.target.is_none(),
            addressable: true,
            protocol: PROTOCOL_NUMBER,
            source: options.source,
        };
        let addr = FrameAddress {
            target: options.target.unwrap_or([0; 6]),
            reserved: [0; 2],
            site: options.site,
            reserved2: 0,
            ack_required: options.ack_required,
            res_required: options.res_required,
            sequence: options.sequence,
        };
        let phead = ProtocolHeader {
            reserved: options.timestamp,
            reserved2: 0,
            typ: typ.get_num(),
        };

        let mut msg = RawMessage {
            frame,
            frame_addr: addr,
            protocol_header: phead,
            payload,
        };

        msg.frame.size = msg.packed_size() as u16;

        Ok(msg)
    }

    /// The total size (in bytes) of the packed version of this message.
    pub fn packed_size(&self) -> usize {
        Frame::packed_size()
            + FrameAddress::packed_size()
            + ProtocolHeader::packed_size()
            + self.payload.len()
    }

    /// Packs this RawMessage into some bytes that can be send over the network.
    ///
    /// The length of the returned data will be [RawMessage::packed_size] in size.
    pub fn pack(&self) -> Result<Vec<u8>, Error> {
        let mut v = Vec::with_capacity(self.packed_size());
        v.extend(self.frame.pack()?);
        v.extend(self.frame_addr.pack()?);
        v.extend(self.protocol_header.pack()?);
        v.extend(&self.payload);
        Ok(v)
    }

    /// Given some bytes (generally read from a network socket), unpack the data into a
    /// `RawMessage` structure.
    ///
    /// The payload is everything after the header, whatever the frame's size field says, cut off
    /// at [MAX_PAYLOAD_SIZE] bytes.
    pub fn unpack(v: &[u8]) -> Result<RawMessage, Error> {
        if v.len() > MAX_DATAGRAM_SIZE {
            return Err(Error::Oversized(v.len()));
        }
        if v.len() < HEADER_SIZE {
            return Err(Error::Truncated(v.len()));
        }

        let mut start = 0;
        let frame = Frame::unpack(v)?;
        start += Frame::packed_size();
        let addr = FrameAddress::unpack(&v[start..])?;
        start += FrameAddress::packed_size();
        let proto = ProtocolHeader::unpack(&v[start..])?;
        start += ProtocolHeader::packed_size();

        let end = v.len().min(start + MAX_PAYLOAD_SIZE);
        let body = Vec::from(&v[start..end]);

        Ok(RawMessage {
            frame,
            frame_addr: addr,
            protocol_header: proto,
            payload: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame() {
        let frame = Frame {
            size: 0x1122,
            origin: 0,
            tagged: true,
            addressable: true,
            protocol: 1024,
            source: 1234567,
        };

        let v = frame.pack().unwrap();
        assert_eq!(v[0], 0x22);
        assert_eq!(v[1], 0x11);

        assert_eq!(v.len(), Frame::packed_size());

        let unpacked = Frame::unpack(&v).unwrap();
        assert_eq!(frame, unpacked);
    }

    #[test]
    fn test_decode_frame() {
        //             00    01    02    03    04    05    06    07
        let v = vec![0x28, 0x00, 0x00, 0x54, 0x42, 0x52, 0x4b, 0x52];
        let frame = Frame::unpack(&v).unwrap();

        // size: 0x0028 ==> 40
        // 0x00, 0x54 (origin, tagged, addressable, protocol)

        //  /-Origin ==> 1
        // || /- addressable=1
        // || |
        // 01010100 00000000
        //   |
        //   \- Tagged=0

        assert_eq!(frame.size, 0x0028);
        assert_eq!(frame.origin, 1);
        assert_eq!(frame.addressable, true);
        assert_eq!(frame.tagged, false);
        assert_eq!(frame.protocol, 1024);
        assert_eq!(frame.source, 0x524b5242);
        assert_eq!(frame.protocol_word(), 0x5400);
    }

    #[test]
    fn test_frame_address() {
        let addr = FrameAddress {
            target: [0xd0, 0x73, 0xd5, 0x01, 0x02, 0x03],
            reserved: [0; 2],
            site: SITE,
            reserved2: 1,
            ack_required: true,
            res_required: false,
            sequence: 248,
        };

        let v = addr.pack().unwrap();
        assert_eq!(v.len(), FrameAddress::packed_size());
        assert_eq!(&v[8..14], b"LIFXV2");
        assert_eq!(v[14], 0b110);

        let unpacked = FrameAddress::unpack(&v).unwrap();
        assert_eq!(addr, unpacked);
    }

    #[test]
    fn test_flags_are_independent() {
        for b in 0u8..=255 {
            let mut v = vec![0; 14];
            v.push(b);
            v.push(0);
            let addr = FrameAddress::unpack(&v).unwrap();
            assert_eq!(addr.res_required, b & 1 == 1);
            assert_eq!(addr.ack_required, b & 2 == 2);
            assert_eq!(addr.reserved2, b >> 2);
            assert_eq!(addr.flags(), b);
        }
    }

    #[test]
    fn test_protocol_header() {
        let header = ProtocolHeader {
            reserved: 0x0102030405060708,
            reserved2: 0,
            typ: 0x4455,
        };

        let v = header.pack().unwrap();
        assert_eq!(v.len(), ProtocolHeader::packed_size());
        assert_eq!(v[0], 0x08);
        assert_eq!(v[8], 0x55);
        assert_eq!(v[9], 0x44);

        let unpacked = ProtocolHeader::unpack(&v).unwrap();
        assert_eq!(header, unpacked);
    }

    #[test]
    fn test_decode_full() {
        // GetService broadcast from the LIFX app
        let v = vec![
            0x24, 0x00, 0x00, 0x34, 0xca, 0x41, 0x37, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x98, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
        ];

        let msg = RawMessage::unpack(&v).unwrap();
        assert_eq!(msg.frame.size, 36);
        assert_eq!(msg.frame.tagged, true);
        assert_eq!(msg.frame.source, 0x053741ca);
        assert_eq!(msg.frame_addr.res_required, true);
        assert_eq!(msg.frame_addr.ack_required, false);
        assert_eq!(msg.frame_addr.sequence, 0x98);
        assert_eq!(msg.protocol_header.typ, 2);
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn test_decode_limits() {
        assert!(matches!(
            RawMessage::unpack(&[0; 20]),
            Err(Error::Truncated(20))
        ));
        assert!(matches!(
            RawMessage::unpack(&[0; MAX_DATAGRAM_SIZE + 1]),
            Err(Error::Oversized(513))
        ));

        // a 300 byte datagram is accepted, but only 128 bytes of payload are kept
        let mut v = vec![0; 300];
        v[0] = 0x2c;
        v[1] = 0x01;
        for (i, b) in v.iter_mut().enumerate().skip(HEADER_SIZE) {
            *b = i as u8;
        }
        let msg = RawMessage::unpack(&v).unwrap();
        assert_eq!(msg.frame.size, 300);
        assert_eq!(msg.payload.len(), MAX_PAYLOAD_SIZE);
        assert_eq!(msg.payload[0], HEADER_SIZE as u8);
    }

    #[test]
    fn test_header_round_trip() {
        let opts = BuildOptions {
            target: Some([0xd0, 0x73, 0xd5, 0xaa, 0xbb, 0xcc]),
            site: SITE,
            origin: 1,
            ack_required: false,
            res_required: true,
            sequence: 17,
            source: 0xdeadbeef,
            timestamp: header_timestamp(1_600_000_000),
        };
        let msg = Message::StateLabel {
            label: Label::new("Desk"),
        };
        let raw = RawMessage::build(&opts, &msg).unwrap();
        let bytes = raw.pack().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 32);
        assert_eq!(&bytes[2..4], &[0x00, 0x54]);

        let decoded = RawMessage::unpack(&bytes).unwrap();
        assert_eq!(decoded, raw);
        assert_eq!(decoded.frame.size as usize, bytes.len());
        assert_eq!(decoded.frame_addr.target, [0xd0, 0x73, 0xd5, 0xaa, 0xbb, 0xcc]);
        assert_eq!(decoded.frame_addr.site, SITE);
        assert_eq!(decoded.protocol_header.reserved, 1_600_000_000_000_614_500);
        assert_eq!(decoded.protocol_header.typ, 25);
    }

    #[test]
    fn test_build_a_packet() {
        // packet taken from https://lan.developer.lifx.com/docs/building-a-lifx-packet

        let msg = Message::LightSetColor {
            reserved: 0,
            color: HSBK {
                hue: 21845,
                saturation: 0xffff,
                brightness: 0xffff,
                kelvin: 3500,
            },
            duration: 1024,
        };

        let raw = RawMessage::build(&BuildOptions::default(), &msg).unwrap();

        let bytes = raw.pack().unwrap();
        assert_eq!(bytes.len(), 49);
        assert_eq!(
            bytes,
            vec![
                0x31, 0x00, 0x00, 0x34, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x66, 0x00, 0x00, 0x00, 0x00, 0x55, 0x55, 0xFF, 0xFF, 0xFF,
                0xFF, 0xAC, 0x0D, 0x00, 0x04, 0x00, 0x00
            ]
        );
    }
}
