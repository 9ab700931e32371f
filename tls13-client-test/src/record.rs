//! An in-memory stand-in for the record layer, so a test can drive the
//! state machine by pushing wire bytes in and reading them back out without
//! sockets or real framing.

use std::collections::VecDeque;

use tls13_client::error::Error;
use tls13_client::msgs::enums::{AlertDescription, HandshakeType};
use tls13_client::provider::{RecordChannel, Transform};

pub struct FakeRecordChannel {
    inbound: VecDeque<(HandshakeType, Vec<u8>)>,
    outbound: Vec<(HandshakeType, Vec<u8>)>,
    alerts_sent: Vec<AlertDescription>,
    dummy_ccs_count: usize,
    inbound_transform: Option<Box<dyn Transform>>,
    outbound_transform: Option<Box<dyn Transform>>,
}

impl FakeRecordChannel {
    pub fn new() -> Self {
        FakeRecordChannel {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            alerts_sent: Vec::new(),
            dummy_ccs_count: 0,
            inbound_transform: None,
            outbound_transform: None,
        }
    }

    /// Queues a message as if it had just arrived over the wire, for the
    /// next `fetch_handshake_msg` to return.
    pub fn push_inbound(&mut self, typ: HandshakeType, body: Vec<u8>) {
        self.inbound.push_back((typ, body));
    }

    /// Drains everything sent via `send_handshake_msg` so far, in order.
    pub fn take_outbound(&mut self) -> Vec<(HandshakeType, Vec<u8>)> {
        std::mem::take(&mut self.outbound)
    }

    pub fn alerts_sent(&self) -> &[AlertDescription] {
        &self.alerts_sent
    }

    pub fn dummy_ccs_count(&self) -> usize {
        self.dummy_ccs_count
    }

    pub fn has_inbound_transform(&self) -> bool {
        self.inbound_transform.is_some()
    }

    pub fn has_outbound_transform(&self) -> bool {
        self.outbound_transform.is_some()
    }
}

impl Default for FakeRecordChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordChannel for FakeRecordChannel {
    fn fetch_handshake_msg(&mut self) -> Result<Option<(HandshakeType, Vec<u8>)>, Error> {
        Ok(self.inbound.pop_front())
    }

    fn send_handshake_msg(&mut self, typ: HandshakeType, body: &[u8]) -> Result<(), Error> {
        self.outbound.push((typ, body.to_vec()));
        Ok(())
    }

    fn send_alert(&mut self, alert: AlertDescription) {
        self.alerts_sent.push(alert);
    }

    fn send_dummy_ccs(&mut self) {
        self.dummy_ccs_count += 1;
    }

    fn set_inbound_transform(&mut self, transform: Box<dyn Transform>) {
        self.inbound_transform = Some(transform);
    }

    fn set_outbound_transform(&mut self, transform: Box<dyn Transform>) {
        self.outbound_transform = Some(transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_returns_queued_messages_in_order() {
        let mut chan = FakeRecordChannel::new();
        chan.push_inbound(HandshakeType::ServerHello, vec![1, 2, 3]);
        chan.push_inbound(HandshakeType::EncryptedExtensions, vec![4]);
        assert_eq!(
            chan.fetch_handshake_msg().unwrap(),
            Some((HandshakeType::ServerHello, vec![1, 2, 3]))
        );
        assert_eq!(
            chan.fetch_handshake_msg().unwrap(),
            Some((HandshakeType::EncryptedExtensions, vec![4]))
        );
        assert_eq!(chan.fetch_handshake_msg().unwrap(), None);
    }

    #[test]
    fn send_records_outbound_messages() {
        let mut chan = FakeRecordChannel::new();
        chan.send_handshake_msg(HandshakeType::ClientHello, &[9, 9]).unwrap();
        assert_eq!(
            chan.take_outbound(),
            vec![(HandshakeType::ClientHello, vec![9, 9])]
        );
        assert!(chan.take_outbound().is_empty());
    }
}
