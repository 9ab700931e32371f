//! (EC)DHE key generation and completion, wrapping `ring::agreement`.

use ring::agreement;
use ring::rand::SystemRandom;

use tls13_client::error::Error;
use tls13_client::msgs::enums::NamedGroup;
use tls13_client::provider::{KeyShare, SharedSecret};

use crate::suites;

/// An ephemeral (EC)DHE keypair. `ring::agreement::EphemeralPrivateKey` is
/// single-use by design (its `agree` consumes `self`), which lines up
/// exactly with [`KeyShare`]'s "exclusively owned, destroyed or completed
/// once" contract.
pub(crate) struct RingKeyShare {
    group: NamedGroup,
    private: agreement::EphemeralPrivateKey,
    public: Vec<u8>,
}

impl KeyShare for RingKeyShare {
    fn group(&self) -> NamedGroup {
        self.group
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn into_any(self: Box<Self>) -> Box<dyn core::any::Any> {
        self
    }
}

pub(crate) fn generate(group: NamedGroup) -> Result<RingKeyShare, Error> {
    let alg = suites::agreement_algorithm(group)
        .ok_or(Error::HandshakeFailure("unsupported (EC)DHE group"))?;
    let rng = SystemRandom::new();
    let private = agreement::EphemeralPrivateKey::generate(alg, &rng)
        .map_err(|_| Error::Internal("ephemeral key generation failed"))?;
    let public = private
        .compute_public_key()
        .map_err(|_| Error::Internal("public key computation failed"))?
        .as_ref()
        .to_vec();
    Ok(RingKeyShare {
        group,
        private,
        public,
    })
}

pub(crate) fn complete(
    ours: Box<dyn KeyShare>,
    their_public: &[u8],
) -> Result<SharedSecret, Error> {
    let ours = ours
        .into_any()
        .downcast::<RingKeyShare>()
        .map_err(|_| Error::Internal("key share was not produced by this provider"))?;
    let alg = suites::agreement_algorithm(ours.group)
        .ok_or(Error::HandshakeFailure("unsupported (EC)DHE group"))?;
    let peer = agreement::UnparsedPublicKey::new(alg, their_public);
    agreement::agree_ephemeral(ours.private, &peer, |shared| shared.to_vec())
        .map(SharedSecret)
        .map_err(|_| Error::HandshakeFailure("ECDHE agreement failed"))
}
