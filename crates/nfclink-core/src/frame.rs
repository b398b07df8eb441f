//! Frames and mode-dependent header layouts
//!
//! The controller prefixes every message with a fixed-size header whose
//! shape depends on the current mode:
//!
//! | Mode       | Size | Layout                                   |
//! |------------|------|------------------------------------------|
//! | `Nci`      | 3    | `gid/mt/pbf`, `oid`, `plen` (u8)         |
//! | `Firmware` | 4    | `type`, `code`, `len` (u16 little-endian) |
//!
//! Both are read off the bus as raw bytes, then decoded into a [`Header`]
//! selected by [`HeaderLayout::for_mode`].

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::{Error, Result};
use crate::mode::Mode;

/// NCI control packet header size
pub const NCI_CTRL_HDR_SIZE: usize = 3;
/// Firmware (bootloader) header size
pub const FW_HDR_SIZE: usize = 4;
/// Largest header across all layouts
pub const MAX_HDR_SIZE: usize = FW_HDR_SIZE;

/// NCI control packet header as it appears on the wire
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct NciCtrlHeader {
    /// Message type (bits 7..5), packet boundary flag (bit 4), group id (bits 3..0)
    pub gid: u8,
    /// Opcode identifier (bits 5..0)
    pub oid: u8,
    /// Payload length
    pub plen: u8,
}

impl NciCtrlHeader {
    /// Message type (1 = command, 2 = response, 3 = notification, 0 = data)
    pub fn message_type(&self) -> u8 {
        (self.gid >> 5) & 0x07
    }

    /// True if more segments of this message follow
    pub fn segmented(&self) -> bool {
        self.gid & 0x10 != 0
    }

    /// Group identifier
    pub fn group_id(&self) -> u8 {
        self.gid & 0x0F
    }

    /// Opcode identifier
    pub fn opcode_id(&self) -> u8 {
        self.oid & 0x3F
    }
}

/// Bootloader message header as it appears on the wire
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct FwHeader {
    /// Message type
    pub msg_type: u8,
    /// Command or response code
    pub code: u8,
    /// Payload length
    pub len: U16,
}

/// Which header layout applies to the bytes on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// 3-byte NCI control header, length in the last byte
    Nci,
    /// 4-byte bootloader header, 16-bit length at offset 2
    Firmware,
}

impl HeaderLayout {
    /// Layout used in `mode`. Cold mode has no framing.
    pub fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Nci => Some(HeaderLayout::Nci),
            Mode::Firmware => Some(HeaderLayout::Firmware),
            Mode::Cold => None,
        }
    }

    /// Header size in bytes
    pub const fn size(self) -> usize {
        match self {
            HeaderLayout::Nci => NCI_CTRL_HDR_SIZE,
            HeaderLayout::Firmware => FW_HDR_SIZE,
        }
    }

    /// Byte offset of the payload length field
    pub const fn length_offset(self) -> usize {
        match self {
            HeaderLayout::Nci => 2,
            HeaderLayout::Firmware => 2,
        }
    }

    /// Decode raw header bytes. `bytes` must be exactly `self.size()` long.
    pub fn decode(self, bytes: &[u8]) -> Result<Header> {
        let short = || Error::MalformedFrame {
            expected: self.size(),
            actual: bytes.len(),
        };
        match self {
            HeaderLayout::Nci => NciCtrlHeader::read_from_bytes(bytes)
                .map(Header::Nci)
                .map_err(|_| short()),
            HeaderLayout::Firmware => FwHeader::read_from_bytes(bytes)
                .map(Header::Firmware)
                .map_err(|_| short()),
        }
    }
}

/// A decoded header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// NCI control header
    Nci(NciCtrlHeader),
    /// Bootloader header
    Firmware(FwHeader),
}

impl Header {
    /// Number of payload bytes that follow the header
    pub fn payload_len(&self) -> usize {
        match self {
            Header::Nci(h) => h.plen as usize,
            Header::Firmware(h) => h.len.get() as usize,
        }
    }

    /// Layout this header was decoded with
    pub fn layout(&self) -> HeaderLayout {
        match self {
            Header::Nci(_) => HeaderLayout::Nci,
            Header::Firmware(_) => HeaderLayout::Firmware,
        }
    }
}

/// One complete message: header followed by payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    /// Allocate an empty frame able to hold `capacity` bytes
    ///
    /// Reports [`Error::OutOfMemory`] instead of aborting when the
    /// allocation cannot be satisfied.
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory {
                requested: capacity,
            })?;
        Ok(Self { data })
    }

    /// Append bytes to the end of the frame
    pub fn put(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Grow the frame by `len` zero bytes and return the new tail for filling
    pub fn put_zeroed(&mut self, len: usize) -> &mut [u8] {
        let start = self.data.len();
        self.data.resize(start + len, 0);
        &mut self.data[start..]
    }

    /// Total length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the frame holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Frame contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the underlying buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
