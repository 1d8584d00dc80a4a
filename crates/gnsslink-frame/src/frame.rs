use std::fmt;

use bytes::Bytes;

/// UBX message identity: class and id bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId {
    pub class: u8,
    pub id: u8,
}

impl MessageId {
    pub const fn new(class: u8, id: u8) -> Self {
        Self { class, id }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}/{:#04x}", self.class, self.id)
    }
}

/// Maximum NMEA address length carried by a [`SentenceId`].
pub const MAX_ADDRESS_LEN: usize = 8;

/// NMEA sentence address, e.g. `GNGGA` or `PUBX`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentenceId {
    address: [u8; MAX_ADDRESS_LEN],
    len: u8,
    parsed: bool,
}

impl SentenceId {
    /// Build an address from ASCII alphanumerics. Returns `None` for anything else.
    pub fn from_address(address: &[u8]) -> Option<Self> {
        if address.is_empty()
            || address.len() > MAX_ADDRESS_LEN
            || !address.iter().all(u8::is_ascii_alphanumeric)
        {
            return None;
        }
        let mut buf = [0u8; MAX_ADDRESS_LEN];
        buf[..address.len()].copy_from_slice(address);
        Some(Self {
            address: buf,
            len: address.len() as u8,
            parsed: true,
        })
    }

    /// Keep an address [`from_address`](Self::from_address) rejects, so its sentence
    /// can still be passed through.
    ///
    /// Non-printable bytes become `?` and the address is cut at [`MAX_ADDRESS_LEN`].
    /// No talker is split off, so the formatter is the whole address.
    pub fn unparsed(address: &[u8]) -> Self {
        let len = address.len().min(MAX_ADDRESS_LEN);
        let mut buf = [0u8; MAX_ADDRESS_LEN];
        for (dst, &src) in buf.iter_mut().zip(&address[..len]) {
            *dst = if (0x20..0x7F).contains(&src) { src } else { b'?' };
        }
        Self {
            address: buf,
            len: len as u8,
            parsed: false,
        }
    }

    /// False for addresses built with [`unparsed`](Self::unparsed).
    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    /// The full address.
    pub fn as_str(&self) -> &str {
        // Only printable ASCII is ever stored.
        std::str::from_utf8(&self.address[..self.len as usize]).unwrap_or("")
    }

    /// Two-letter talker of a standard five-letter address (`GN` in `GNGGA`).
    pub fn talker(&self) -> Option<&str> {
        (self.parsed && self.len == 5).then(|| &self.as_str()[..2])
    }

    /// Sentence formatter, talker-independent (`GGA` in `GNGGA`).
    ///
    /// Proprietary, non-standard and unparsed addresses are returned whole.
    pub fn formatter(&self) -> &str {
        match self.len {
            5 if self.parsed => &self.as_str()[2..],
            _ => self.as_str(),
        }
    }
}

impl fmt::Debug for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SentenceId").field(&self.as_str()).finish()
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which wire format a frame arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Binary,
    Text,
}

/// Identity of a recovered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKey {
    Ubx(MessageId),
    Nmea(SentenceId),
}

impl FrameKey {
    pub fn format(&self) -> FrameFormat {
        match self {
            FrameKey::Ubx(_) => FrameFormat::Binary,
            FrameKey::Nmea(_) => FrameFormat::Text,
        }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKey::Ubx(id) => write!(f, "UBX {} ({})", crate::message_name(*id), id),
            FrameKey::Nmea(sentence) => write!(f, "NMEA {sentence}"),
        }
    }
}

/// A checksum-validated frame.
///
/// For UBX frames `payload` holds only the message payload. For NMEA sentences it
/// holds the body between `$` and `*`, address included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub key: FrameKey,
    pub payload: Bytes,
}

impl RawFrame {
    pub fn ubx(id: MessageId, payload: impl Into<Bytes>) -> Self {
        Self {
            key: FrameKey::Ubx(id),
            payload: payload.into(),
        }
    }

    pub fn nmea(sentence: SentenceId, body: impl Into<Bytes>) -> Self {
        Self {
            key: FrameKey::Nmea(sentence),
            payload: body.into(),
        }
    }

    pub fn format(&self) -> FrameFormat {
        self.key.format()
    }

    pub fn message_id(&self) -> Option<MessageId> {
        match self.key {
            FrameKey::Ubx(id) => Some(id),
            FrameKey::Nmea(_) => None,
        }
    }

    pub fn sentence(&self) -> Option<SentenceId> {
        match self.key {
            FrameKey::Ubx(_) => None,
            FrameKey::Nmea(sentence) => Some(sentence),
        }
    }

    /// Size the frame occupied on the wire.
    pub fn wire_size(&self) -> usize {
        match self.key {
            FrameKey::Ubx(_) => crate::codec::UBX_OVERHEAD + self.payload.len(),
            // '$' + body + '*' + 2 hex digits + CR LF
            FrameKey::Nmea(_) => self.payload.len() + 6,
        }
    }
}
