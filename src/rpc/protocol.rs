//! Wire format for the binary RPC protocol: big-endian fixed header, a
//! request-specific fixed tail, and an optional trailing payload.
//!
//! Every message (both directions) starts with the same 44-byte header:
//!
//! ```text
//! signature   : u32  magic constant, shared by every message
//! struct_size : u32  byte size of the fixed request/response struct that follows
//! msg_type    : u32  RequestType discriminant
//! password    : [u8; 32]  null-padded shared secret
//! ```
//!
//! A trailing payload, when present, is a back-to-back sequence of entries.
//! Every entry is padded with trailing null bytes so the next entry starts on
//! a 4-byte boundary (`pad_to_4`) — required for ARM-style alignment on the
//! receiving end. This crate pads every entry, not only the last, which is a
//! strict superset of "pad only the last entry": bit-identical on the wire for
//! the final entry, and keeps every earlier entry aligned too.

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Magic constant identifying this protocol. Arbitrary but fixed; chosen so a
/// misdirected connection (wrong protocol entirely) is rejected on the first read.
pub(crate) const SIGNATURE: u32 = 0x4E5A_4247; // "NZBG" in ASCII, byte-for-byte

/// Null-padded password field width, in bytes.
pub(crate) const PASSWORD_LEN: usize = 32;

/// Size of the fixed header: signature + struct_size + msg_type + password.
pub(crate) const HEADER_SIZE: usize = 4 + 4 + 4 + PASSWORD_LEN;

/// Request kinds, numbered per the wire protocol (1-indexed, fixed ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestType {
    Download = 1,
    PauseUnpause = 2,
    List = 3,
    SetDownloadRate = 4,
    DumpDebug = 5,
    EditQueue = 6,
    Log = 7,
    Shutdown = 8,
    Version = 9,
    PostQueue = 10,
    WriteLog = 11,
    Scan = 12,
    PauseUnpausePostProcessor = 13,
    History = 14,
}

impl RequestType {
    pub(crate) fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Download,
            2 => Self::PauseUnpause,
            3 => Self::List,
            4 => Self::SetDownloadRate,
            5 => Self::DumpDebug,
            6 => Self::EditQueue,
            7 => Self::Log,
            8 => Self::Shutdown,
            9 => Self::Version,
            10 => Self::PostQueue,
            11 => Self::WriteLog,
            12 => Self::Scan,
            13 => Self::PauseUnpausePostProcessor,
            14 => Self::History,
            _ => return None,
        })
    }
}

/// The fixed header every message starts with.
#[derive(Debug, Clone)]
pub(crate) struct MessageHeader {
    pub(crate) struct_size: u32,
    pub(crate) msg_type: u32,
    pub(crate) password: [u8; PASSWORD_LEN],
}

#[derive(Debug, Error)]
pub(crate) enum ProtocolError {
    #[error("connection closed before a full message was read")]
    ConnectionClosed,
    #[error("bad signature: expected {expected:#x}, got {actual:#x}")]
    BadSignature { expected: u32, actual: u32 },
    #[error("unknown request type: {0}")]
    UnknownType(u32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read and validate the fixed header from `reader`. Does not check the password
/// (the caller compares it against the configured secret, since an empty
/// configured password means "accept anything").
pub(crate) async fn read_header<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<MessageHeader, ProtocolError> {
    let mut buf = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }

    let signature = u32::from_be_bytes(buf[0..4].try_into().expect("4-byte slice"));
    if signature != SIGNATURE {
        return Err(ProtocolError::BadSignature {
            expected: SIGNATURE,
            actual: signature,
        });
    }

    let struct_size = u32::from_be_bytes(buf[4..8].try_into().expect("4-byte slice"));
    let msg_type = u32::from_be_bytes(buf[8..12].try_into().expect("4-byte slice"));
    let mut password = [0u8; PASSWORD_LEN];
    password.copy_from_slice(&buf[12..12 + PASSWORD_LEN]);

    Ok(MessageHeader {
        struct_size,
        msg_type,
        password,
    })
}

/// Write a response header followed by the caller-supplied fixed tail and
/// trailing payload.
pub(crate) async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u32,
    tail: &[u8],
    trailing: &[u8],
) -> Result<(), ProtocolError> {
    let struct_size = (HEADER_SIZE + tail.len()) as u32;

    writer.write_all(&SIGNATURE.to_be_bytes()).await?;
    writer.write_all(&struct_size.to_be_bytes()).await?;
    writer.write_all(&msg_type.to_be_bytes()).await?;
    writer.write_all(&[0u8; PASSWORD_LEN]).await?;
    writer.write_all(tail).await?;
    writer.write_all(trailing).await?;
    writer.flush().await?;
    Ok(())
}

/// Build a bool-response tail: `{success: u32, trailing_text_length: u32}`,
/// followed by a null-terminated status string as the trailing payload.
pub(crate) fn bool_response(success: bool, message: &str) -> (Vec<u8>, Vec<u8>) {
    let mut text = message.as_bytes().to_vec();
    text.push(0);
    pad_to_4(&mut text);

    let mut tail = Vec::with_capacity(8);
    tail.extend_from_slice(&(success as u32).to_be_bytes());
    tail.extend_from_slice(&(text.len() as u32).to_be_bytes());

    (tail, text)
}

/// Append null bytes to `buf` until its length is a multiple of 4.
pub(crate) fn pad_to_4(buf: &mut Vec<u8>) {
    let pad = (4 - (buf.len() % 4)) % 4;
    buf.resize(buf.len() + pad, 0);
}

/// Read exactly `len` bytes of trailing payload following the fixed tail.
pub(crate) async fn read_trailing<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    len: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Append a null-terminated, 4-byte-padded string to an entry buffer and
/// return the padded byte length written (needed by callers that declare a
/// per-entry string length field).
pub(crate) fn push_padded_string(buf: &mut Vec<u8>, s: &str) -> u32 {
    let start = buf.len();
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    pad_to_4(buf);
    (buf.len() - start) as u32
}
