// ── Credential jar record ──
//
// Layout (big endian):
//
//   magic    u32   0xDEADBEEF
//   version  u16
//   cookie   u16 length + UTF-8 bytes (length 0 = absent)
//   token    u16 length + UTF-8 bytes (length 0 = absent)
//
// Each field is capped at 128 bytes, the size of the fixed slots the
// record replaced.

use bytes::{Buf, BufMut, BytesMut};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Namespace the jar is stored under.
pub const JAR_NAMESPACE: &str = "cookie-jar";

const MAGIC: u32 = 0xDEAD_BEEF;
const VERSION: u16 = 1;
const MAX_FIELD: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JarError {
    #[error("bad magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported jar version {0}")]
    UnsupportedVersion(u16),
    #[error("record truncated")]
    Truncated,
    #[error("{field} is {len} bytes (max {MAX_FIELD})")]
    FieldTooLong { field: &'static str, len: usize },
    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

/// Persisted admin cookie and access token.
#[derive(Debug, Clone, Default)]
pub struct CredentialJar {
    pub cookie: Option<SecretString>,
    pub token: Option<SecretString>,
}

impl CredentialJar {
    pub fn encode(&self) -> Result<Vec<u8>, JarError> {
        let mut buf = BytesMut::with_capacity(8 + 2 * MAX_FIELD);
        buf.put_u32(MAGIC);
        buf.put_u16(VERSION);
        put_field(&mut buf, "cookie", self.cookie.as_ref())?;
        put_field(&mut buf, "token", self.token.as_ref())?;
        Ok(buf.to_vec())
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Self, JarError> {
        if bytes.remaining() < 6 {
            return Err(JarError::Truncated);
        }
        let magic = bytes.get_u32();
        if magic != MAGIC {
            return Err(JarError::BadMagic(magic));
        }
        let version = bytes.get_u16();
        if version != VERSION {
            return Err(JarError::UnsupportedVersion(version));
        }
        let cookie = take_field(&mut bytes, "cookie")?;
        let token = take_field(&mut bytes, "token")?;
        Ok(Self { cookie, token })
    }
}

fn put_field(
    buf: &mut BytesMut,
    field: &'static str,
    value: Option<&SecretString>,
) -> Result<(), JarError> {
    let bytes = value.map_or(&[][..], |v| v.expose_secret().as_bytes());
    let len = u16::try_from(bytes.len())
        .ok()
        .filter(|_| bytes.len() <= MAX_FIELD)
        .ok_or(JarError::FieldTooLong {
            field,
            len: bytes.len(),
        })?;
    buf.put_u16(len);
    buf.put_slice(bytes);
    Ok(())
}

fn take_field(bytes: &mut &[u8], field: &'static str) -> Result<Option<SecretString>, JarError> {
    if bytes.remaining() < 2 {
        return Err(JarError::Truncated);
    }
    let len = usize::from(bytes.get_u16());
    if len > MAX_FIELD {
        return Err(JarError::FieldTooLong { field, len });
    }
    if bytes.remaining() < len {
        return Err(JarError::Truncated);
    }
    let raw = bytes.copy_to_bytes(len);
    if raw.is_empty() {
        return Ok(None);
    }
    let text = String::from_utf8(raw.to_vec()).map_err(|_| JarError::InvalidUtf8(field))?;
    Ok(Some(SecretString::from(text)))
}
