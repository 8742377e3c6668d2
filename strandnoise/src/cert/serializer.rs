// Certificate binary serializer / deserializer.
//
// Wire format (big-endian, fixed 149 bytes):
// [version:1B][serial:4B][key:32B][issuer_pk:32B]
// [valid_from:8B][valid_until:8B][signature:64B]

use crate::cert::NoiseCertificate;
use crate::error::{NoiseError, Result};

/// Serialize a [`NoiseCertificate`] into its compact binary form.
pub fn serialize(cert: &NoiseCertificate) -> Vec<u8> {
    let mut buf = cert.signable_bytes();
    buf.extend_from_slice(&cert.signature);
    buf
}

/// Deserialize a [`NoiseCertificate`]. Trailing bytes are rejected.
pub fn deserialize(data: &[u8]) -> Result<NoiseCertificate> {
    let mut reader = Reader { data, pos: 0 };

    let version = reader.u8()?;
    if version != NoiseCertificate::VERSION {
        return Err(NoiseError::CertificateVersionUnsupported(version));
    }

    let serial = u32::from_be_bytes(reader.array()?);
    let key = reader.array()?;
    let issuer_public_key = reader.array()?;
    let valid_from = u64::from_be_bytes(reader.array()?);
    let valid_until = u64::from_be_bytes(reader.array()?);
    let signature = reader.array()?;

    if reader.pos != data.len() {
        return Err(NoiseError::CertificateDeserialization(format!(
            "{} trailing bytes",
            data.len() - reader.pos
        )));
    }

    Ok(NoiseCertificate {
        serial,
        key,
        issuer_public_key,
        valid_from,
        valid_until,
        signature,
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn u8(&mut self) -> Result<u8> {
        let [b] = self.array::<1>()?;
        Ok(b)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        if end > self.data.len() {
            return Err(NoiseError::CertificateDeserialization(
                "unexpected end of data".into(),
            ));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::builder::CertificateBuilder;
    use crate::crypto::keys::IdentityKeyPair;

    fn sample() -> NoiseCertificate {
        let issuer = IdentityKeyPair::generate();
        CertificateBuilder::new(&issuer)
            .key([0x11; 32])
            .serial(0xDEAD_BEEF)
            .validity(100, 200)
            .build()
            .unwrap()
    }

    #[test]
    fn roundtrip() {
        let cert = sample();
        let bytes = serialize(&cert);
        assert_eq!(bytes.len(), NoiseCertificate::ENCODED_LEN);
        assert_eq!(deserialize(&bytes).unwrap(), cert);
    }

    #[test]
    fn layout_is_big_endian() {
        let bytes = serialize(&sample());
        assert_eq!(bytes[0], NoiseCertificate::VERSION);
        assert_eq!(&bytes[1..5], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&bytes[5..37], &[0x11; 32]);
    }

    #[test]
    fn bad_version_fails() {
        let mut bytes = serialize(&sample());
        bytes[0] = 0xFF;
        assert!(matches!(
            deserialize(&bytes),
            Err(NoiseError::CertificateVersionUnsupported(0xFF))
        ));
    }

    #[test]
    fn truncated_data_fails() {
        let bytes = serialize(&sample());
        assert!(deserialize(&bytes[..bytes.len() - 1]).is_err());
        assert!(deserialize(&[NoiseCertificate::VERSION, 0, 0]).is_err());
    }

    #[test]
    fn trailing_data_fails() {
        let mut bytes = serialize(&sample());
        bytes.push(0);
        assert!(matches!(
            deserialize(&bytes),
            Err(NoiseError::CertificateDeserialization(_))
        ));
    }
}
