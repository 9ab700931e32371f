//! PSK identity and binder handling (spec §4.3): "the horrifying TLS 1.3
//! hack where the `pre_shared_key` extension's binders have a data
//! dependency on the message they are themselves contained within."
//!
//! `pre_shared_key` is written in two passes. First the identities are
//! serialized with a correctly-sized but zeroed binder list, so the
//! extension (and therefore the whole `ClientHello`) has its final length.
//! Then [`ClientHelloPayload::encode_for_binder_signing`] is hashed per PSK
//! and the binder bytes are patched in before the message is actually sent.
//! The hashed prefix stops at the binders list's own 2-byte length prefix —
//! RFC 8446 §4.2.11.2: the binder covers the ClientHello up to but excluding
//! the binder list, not just the binder entries themselves. `pre_shared_key`
//! must be the last extension in the list for this to work (spec §3's
//! invariant on `HandshakeContext`).

use crate::codec::{put_u16, put_u16_prefixed, put_u32, put_u8};
use crate::error::Error;
use crate::msgs::enums::ExtensionType;
use crate::provider::{HashAlgorithm, KeySchedule, PskType};

/// One offered PSK: either an out-of-band external PSK or a resumption
/// ticket previously issued by this server (spec §3's `Session`/ticket
/// store, §4.9's `NewSessionTicket` intake).
pub struct OfferedPsk {
    pub identity: Vec<u8>,
    pub secret: Vec<u8>,
    pub psk_type: PskType,
    pub hash: HashAlgorithm,
    /// Ticket age-add and receipt time, for the obfuscated-age calculation;
    /// `None` for external PSKs, which carry `obfuscated_ticket_age = 0`
    /// (RFC 8446 §4.2.11).
    pub ticket_origin: Option<TicketOrigin>,
}

pub struct TicketOrigin {
    pub age_add: u32,
    pub received_at_unix_seconds: u64,
}

/// RFC 8446 §4.2.11.1's `obfuscated_ticket_age` formula: the ticket's true
/// age, rounded down by one second unless it's already zero, converted to
/// milliseconds, and wrapped with `age_add` mod 2^32.
pub fn obfuscated_ticket_age(origin: &TicketOrigin, now_unix_seconds: u64) -> u32 {
    let mut age_seconds = now_unix_seconds.saturating_sub(origin.received_at_unix_seconds);
    if age_seconds > 0 {
        age_seconds -= 1;
    }
    let age_ms = age_seconds.saturating_mul(1000);
    (age_ms as u32).wrapping_add(origin.age_add)
}

/// Writes `pre_shared_key`'s identity list and a same-length list of
/// zeroed binder placeholders, returning the offset (from the start of
/// `out`) of the binders list's own 2-byte length prefix — the boundary at
/// which the binder-signing hash must stop, per RFC 8446 §4.2.11.2. The
/// caller uses that offset with
/// [`crate::msgs::handshake::ClientHelloPayload::encode_for_binder_signing`]
/// once the rest of the `ClientHello` — this extension included, but with
/// binders still zeroed — has been assembled.
pub fn write_identities_with_placeholder_binders(
    out: &mut Vec<u8>,
    psks: &[OfferedPsk],
    now_unix_seconds: u64,
) -> Result<usize, Error> {
    if psks.is_empty() {
        return Err(Error::Internal("write_identities called with no PSKs"));
    }
    let ext_start = out.len();
    put_u16(out, ExtensionType::PRE_SHARED_KEY.0);
    let mut body = Vec::new();
    put_u16_prefixed(&mut body, |body| {
        for psk in psks {
            put_u16_prefixed(body, |body| body.extend_from_slice(&psk.identity)).unwrap();
            let age = match &psk.ticket_origin {
                Some(origin) => obfuscated_ticket_age(origin, now_unix_seconds),
                None => 0,
            };
            put_u32(body, age);
        }
    })?;
    let binders_len_offset = body.len();
    put_u16_prefixed(&mut body, |body| {
        for psk in psks {
            put_u8(body, psk.hash.len() as u8);
            body.extend(std::iter::repeat(0u8).take(psk.hash.len()));
        }
    })?;
    // binders_len_offset is where the binders list's own 2-byte length
    // prefix starts, inside `body`; translate that into an offset within
    // `out` after this extension is appended. The binder region — and so
    // the part excluded from the signing hash — starts here, at the length
    // prefix itself, not at the first binder entry past it.
    let extension_header_len = 2 + 2; // type + length-of-extension-body
    put_u16_prefixed(out, |out| out.extend_from_slice(&body))?;
    Ok(ext_start + extension_header_len + binders_len_offset)
}

/// Computes and writes the real binder values over `truncated`, the
/// `ClientHello` encoded up to (not including) the binder list's own
/// 2-byte length prefix. `binders_offset` points at that length prefix, so
/// the per-entry walk steps over it before landing on the first entry's
/// 1-byte length byte.
pub fn fill_in_binders(
    full_client_hello: &mut [u8],
    binders_offset: usize,
    truncated: &[u8],
    psks: &[OfferedPsk],
    ks: &dyn KeySchedule,
) -> Result<(), Error> {
    let mut offset = binders_offset + 2; // step over the binders list's own length prefix
    for psk in psks {
        let transcript_hash = ks.transcript_hash(psk.hash, truncated);
        let mut binder = vec![0u8; psk.hash.len()];
        ks.create_psk_binder(
            psk.hash,
            &psk.secret,
            psk.psk_type,
            &transcript_hash,
            &mut binder,
        )?;
        offset += 1; // step over this entry's 1-byte length prefix
        let len = binder.len();
        full_client_hello[offset..offset + len].copy_from_slice(&binder);
        offset += len;
    }
    if offset != full_client_hello.len() {
        return Err(Error::Internal("binder region length mismatch"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obfuscated_age_rounds_down_by_one_second_unless_zero() {
        let origin = TicketOrigin {
            age_add: 1000,
            received_at_unix_seconds: 100,
        };
        assert_eq!(obfuscated_ticket_age(&origin, 100), 1000);
        assert_eq!(obfuscated_ticket_age(&origin, 105), 4000 + 1000);
    }

    #[test]
    fn obfuscated_age_wraps_mod_2_32() {
        let origin = TicketOrigin {
            age_add: u32::MAX,
            received_at_unix_seconds: 0,
        };
        assert_eq!(obfuscated_ticket_age(&origin, 0), u32::MAX);
    }

    fn psk(identity: &[u8], secret: &[u8]) -> OfferedPsk {
        OfferedPsk {
            identity: identity.to_vec(),
            secret: secret.to_vec(),
            psk_type: PskType::External,
            hash: HashAlgorithm::Sha256,
            ticket_origin: None,
        }
    }

    #[test]
    fn returned_offset_points_at_the_binders_list_length_prefix_not_past_it() {
        let psks = vec![psk(b"id-a", b"secret-a")];
        let mut out = Vec::new();
        let offset = write_identities_with_placeholder_binders(&mut out, &psks, 0).unwrap();

        // Binders list for one SHA-256 PSK: 2-byte list length, then a
        // 1-byte entry length followed by 32 zeroed bytes.
        let binders_list_len = 1 + 32;
        assert_eq!(
            u16::from_be_bytes([out[offset], out[offset + 1]]),
            binders_list_len as u16
        );
        // Everything from `offset` onward is the binder region; nothing
        // before it may change once the real binder is patched in.
        assert_eq!(out.len() - offset, 2 + binders_list_len);
    }

    #[test]
    fn fill_in_binders_writes_only_inside_the_binder_region() {
        let psks = vec![psk(b"id-a", b"secret-a"), psk(b"id-b", b"secret-b")];
        let mut out = Vec::new();
        let offset = write_identities_with_placeholder_binders(&mut out, &psks, 0).unwrap();
        let truncated = out[..offset].to_vec();

        let ks = tls13_client_test::FakeKeySchedule::new();
        fill_in_binders(&mut out, offset, &truncated, &psks, &ks).unwrap();

        assert_eq!(&out[..offset], &truncated[..]);
        assert_ne!(out[offset + 2 + 1..offset + 2 + 1 + 32].to_vec(), vec![0u8; 32]);
    }
}
