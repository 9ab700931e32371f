//! Extension wire encode/decode plus the per-message allow-masks from
//! spec §9: "Extension allow-masks replace the source's per-message switch
//! tables." Each allow-mask is a bitset over [`ExtensionType::mask_bit`];
//! an extension absent from the mask for its enclosing message is either
//! `UnsupportedExtension` (if this crate doesn't recognize the type at
//! all) or `IllegalParameter` (if it's recognized but not legal here).

use crate::codec::{put_u16, put_u16_prefixed, put_u8, Reader};
use crate::error::Error;
use crate::msgs::enums::{ExtensionType, NamedGroup, ProtocolVersion, SignatureScheme};

/// A parsed-but-uninterpreted extension: type plus raw body. Interpreting
/// the body is the job of the `get_*` accessors below, invoked only after
/// [`check_allowed`] has validated the enclosing message's extension set.
pub struct RawExtension {
    pub typ: ExtensionType,
    pub body: Vec<u8>,
}

pub fn read_extensions(r: &mut Reader<'_>) -> Result<Vec<RawExtension>, Error> {
    let mut exts_reader = r.length_prefixed(2)?;
    let mut out = Vec::new();
    while !exts_reader.eof() {
        let typ = ExtensionType(exts_reader.u16()?);
        let body = exts_reader.length_prefixed(2)?.rest().to_vec();
        out.push(RawExtension { typ, body });
    }
    Ok(out)
}

pub fn has_duplicate(exts: &[RawExtension]) -> bool {
    for (i, a) in exts.iter().enumerate() {
        for b in &exts[i + 1..] {
            if a.typ == b.typ {
                return true;
            }
        }
    }
    false
}

pub fn find<'a>(exts: &'a [RawExtension], typ: ExtensionType) -> Option<&'a RawExtension> {
    exts.iter().find(|e| e.typ == typ)
}

/// A bitset over [`ExtensionType::mask_bit`].
pub type AllowMask = u64;

pub const ALLOWED_SH: AllowMask = bits(&[
    ExtensionType::SUPPORTED_VERSIONS,
    ExtensionType::KEY_SHARE,
    ExtensionType::PRE_SHARED_KEY,
]);

pub const ALLOWED_HRR: AllowMask = bits(&[
    ExtensionType::SUPPORTED_VERSIONS,
    ExtensionType::KEY_SHARE,
    ExtensionType::COOKIE,
]);

pub const ALLOWED_EE: AllowMask = bits(&[ExtensionType::ALPN, ExtensionType::EARLY_DATA]);

pub const ALLOWED_CR: AllowMask = bits(&[
    ExtensionType::SIGNATURE_ALGORITHMS,
    ExtensionType::CERTIFICATE_AUTHORITIES,
]);

pub const ALLOWED_NST: AllowMask = bits(&[ExtensionType::EARLY_DATA]);

const fn bits(types: &[ExtensionType]) -> AllowMask {
    let mut mask = 0u64;
    let mut i = 0;
    while i < types.len() {
        // mask_bit() isn't const-fn-friendly with `match` over associated
        // consts in stable Rust at this MSRV, so the table is duplicated
        // here in terms of the raw wire value instead of calling it.
        let bit = match types[i].0 {
            0 => 0,
            10 => 1,
            13 => 2,
            16 => 3,
            44 => 4,
            45 => 5,
            47 => 6,
            43 => 7,
            51 => 8,
            42 => 9,
            41 => 10,
            _ => 63,
        };
        mask |= 1 << bit;
        i += 1;
    }
    mask
}

pub fn check_allowed(exts: &[RawExtension], mask: AllowMask) -> Result<(), Error> {
    for ext in exts {
        match ext.typ.mask_bit() {
            None => {
                return Err(Error::UnsupportedExtension(
                    "unrecognized extension in handshake message",
                ))
            }
            Some(bit) if mask & (1 << bit) == 0 => {
                return Err(Error::IllegalParameter(
                    "extension not allowed in this message",
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// --- ClientHello extension writers (spec §4.2) ---

pub fn write_supported_versions(out: &mut Vec<u8>, offer_tls12: bool) -> Result<(), Error> {
    put_u16(out, ExtensionType::SUPPORTED_VERSIONS.0);
    put_u16_prefixed(out, |out| {
        let count = if offer_tls12 { 2 } else { 1 };
        put_u8(out, (count * 2) as u8);
        put_u16(out, ProtocolVersion::TLS1_3.0);
        if offer_tls12 {
            put_u16(out, ProtocolVersion::TLS1_2.0);
        }
    })
}

pub fn write_cookie(out: &mut Vec<u8>, cookie: &[u8]) -> Result<(), Error> {
    put_u16(out, ExtensionType::COOKIE.0);
    put_u16_prefixed(out, |out| {
        put_u16_prefixed(out, |out| out.extend_from_slice(cookie)).unwrap();
    })
}

pub fn write_key_share(out: &mut Vec<u8>, group: NamedGroup, key_exchange: &[u8]) -> Result<(), Error> {
    put_u16(out, ExtensionType::KEY_SHARE.0);
    put_u16_prefixed(out, |out| {
        put_u16_prefixed(out, |out| {
            put_u16(out, group.0);
            put_u16_prefixed(out, |out| out.extend_from_slice(key_exchange)).unwrap();
        })
        .unwrap();
    })
}

pub fn write_early_data(out: &mut Vec<u8>) -> Result<(), Error> {
    put_u16(out, ExtensionType::EARLY_DATA.0);
    put_u16(out, 0);
    Ok(())
}

pub fn write_psk_key_exchange_modes(
    out: &mut Vec<u8>,
    modes: &[crate::msgs::enums::PskKeyExchangeMode],
) -> Result<(), Error> {
    put_u16(out, ExtensionType::PSK_KEY_EXCHANGE_MODES.0);
    put_u16_prefixed(out, |out| {
        put_u8(out, modes.len() as u8);
        for m in modes {
            put_u8(out, m.wire_value());
        }
    })
}

pub fn write_signature_algorithms(out: &mut Vec<u8>, schemes: &[SignatureScheme]) -> Result<(), Error> {
    put_u16(out, ExtensionType::SIGNATURE_ALGORITHMS.0);
    put_u16_prefixed(out, |out| {
        put_u16_prefixed(out, |out| {
            for s in schemes {
                put_u16(out, s.0);
            }
        })
        .unwrap();
    })
}

pub fn write_alpn(out: &mut Vec<u8>, protocols: &[Vec<u8>]) -> Result<(), Error> {
    put_u16(out, ExtensionType::ALPN.0);
    put_u16_prefixed(out, |out| {
        put_u16_prefixed(out, |out| {
            for p in protocols {
                put_u8(out, p.len() as u8);
                out.extend_from_slice(p);
            }
        })
        .unwrap();
    })
}

// --- ServerHello / HRR extension accessors (spec §4.4-4.5) ---

pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub key_exchange: Vec<u8>,
}

pub fn get_supported_versions(exts: &[RawExtension]) -> Option<ProtocolVersion> {
    let ext = find(exts, ExtensionType::SUPPORTED_VERSIONS)?;
    let mut r = Reader::init(&ext.body);
    Some(ProtocolVersion(r.u16().ok()?))
}

pub fn get_server_key_share(exts: &[RawExtension]) -> Result<Option<KeyShareEntry>, Error> {
    let Some(ext) = find(exts, ExtensionType::KEY_SHARE) else {
        return Ok(None);
    };
    let mut r = Reader::init(&ext.body);
    let group = NamedGroup(r.u16()?);
    let key_exchange = r.length_prefixed(2)?.rest().to_vec();
    r.expect_exhausted()?;
    Ok(Some(KeyShareEntry { group, key_exchange }))
}

/// The single `selected_group` an HRR's `key_share` extension carries, as
/// opposed to a full entry in ServerHello's.
pub fn get_hrr_selected_group(exts: &[RawExtension]) -> Result<Option<NamedGroup>, Error> {
    let Some(ext) = find(exts, ExtensionType::KEY_SHARE) else {
        return Ok(None);
    };
    let mut r = Reader::init(&ext.body);
    let group = NamedGroup(r.u16()?);
    r.expect_exhausted()?;
    Ok(Some(group))
}

pub fn get_cookie(exts: &[RawExtension]) -> Result<Option<Vec<u8>>, Error> {
    let Some(ext) = find(exts, ExtensionType::COOKIE) else {
        return Ok(None);
    };
    let mut r = Reader::init(&ext.body);
    Ok(Some(r.length_prefixed(2)?.rest().to_vec()))
}

pub fn get_selected_psk_identity(exts: &[RawExtension]) -> Result<Option<u16>, Error> {
    let Some(ext) = find(exts, ExtensionType::PRE_SHARED_KEY) else {
        return Ok(None);
    };
    let mut r = Reader::init(&ext.body);
    let idx = r.u16()?;
    r.expect_exhausted()?;
    Ok(Some(idx))
}

/// `EncryptedExtensions`' `alpn` carries exactly one selected protocol,
/// unlike the client's offer list.
pub fn get_ee_alpn_protocol(exts: &[RawExtension]) -> Result<Option<Vec<u8>>, Error> {
    let Some(ext) = find(exts, ExtensionType::ALPN) else {
        return Ok(None);
    };
    let mut list = Reader::init(&ext.body).length_prefixed(2)?;
    let len = list.u8()? as usize;
    let proto = list.take(len)?.to_vec();
    list.expect_exhausted()?;
    Ok(Some(proto))
}

/// `EncryptedExtensions`' `early_data` is a zero-length acknowledgement;
/// anything else is `DecodeError`.
pub fn get_ee_early_data(exts: &[RawExtension]) -> Result<bool, Error> {
    match find(exts, ExtensionType::EARLY_DATA) {
        None => Ok(false),
        Some(ext) if ext.body.is_empty() => Ok(true),
        Some(_) => Err(Error::DecodeError("early_data in EncryptedExtensions must be empty")),
    }
}

pub fn get_signature_algorithms(exts: &[RawExtension]) -> Result<Option<Vec<SignatureScheme>>, Error> {
    let Some(ext) = find(exts, ExtensionType::SIGNATURE_ALGORITHMS) else {
        return Ok(None);
    };
    let mut list = Reader::init(&ext.body).length_prefixed(2)?;
    let mut schemes = Vec::new();
    while !list.eof() {
        schemes.push(SignatureScheme(list.u16()?));
    }
    Ok(Some(schemes))
}

/// `NewSessionTicket`'s `early_data` carries a 4-byte `max_early_data_size`,
/// unlike `EncryptedExtensions`' empty ack.
pub fn get_nst_max_early_data_size(exts: &[RawExtension]) -> Result<Option<u32>, Error> {
    let Some(ext) = find(exts, ExtensionType::EARLY_DATA) else {
        return Ok(None);
    };
    if ext.body.len() != 4 {
        return Err(Error::DecodeError("early_data in NewSessionTicket must be 4 bytes"));
    }
    let mut r = Reader::init(&ext.body);
    Ok(Some(r.u32()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_key_share() {
        let mut out = Vec::new();
        write_key_share(&mut out, NamedGroup::X25519, &[1, 2, 3, 4]).unwrap();
        let mut r = Reader::init(&out);
        let typ = ExtensionType(r.u16().unwrap());
        assert_eq!(typ, ExtensionType::KEY_SHARE);
        let body = r.length_prefixed(2).unwrap().rest().to_vec();
        let parsed = get_server_key_share(&[RawExtension { typ, body }])
            .unwrap()
            .unwrap();
        assert_eq!(parsed.group, NamedGroup::X25519);
        assert_eq!(parsed.key_exchange, vec![1, 2, 3, 4]);
    }

    #[test]
    fn unknown_extension_is_unsupported_not_illegal() {
        let exts = vec![RawExtension {
            typ: ExtensionType(0xFFFF),
            body: vec![],
        }];
        assert_eq!(
            check_allowed(&exts, ALLOWED_SH),
            Err(Error::UnsupportedExtension(
                "unrecognized extension in handshake message"
            ))
        );
    }

    #[test]
    fn known_but_disallowed_extension_is_illegal_parameter() {
        let exts = vec![RawExtension {
            typ: ExtensionType::SIGNATURE_ALGORITHMS,
            body: vec![],
        }];
        assert_eq!(
            check_allowed(&exts, ALLOWED_SH),
            Err(Error::IllegalParameter("extension not allowed in this message"))
        );
    }

    #[test]
    fn ee_early_data_must_be_empty() {
        let exts = vec![RawExtension {
            typ: ExtensionType::EARLY_DATA,
            body: vec![1],
        }];
        assert!(get_ee_early_data(&exts).is_err());
    }
}
