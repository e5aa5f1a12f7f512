//! Transport abstraction for device communication.
//!
//! A [`Transport`] is a byte-oriented channel to a physical (or simulated)
//! Ledger device: it carries one APDU command out and one APDU response
//! back, and knows nothing about the app-level protocol on top. Concrete
//! implementations:
//!
//! - [`crate::hid::HidTransport`] for USB HID (feature `hid`)
//! - scripted mocks in tests
//!
//! Exchanges are `async` because a single round-trip may block for a
//! human-scale duration: the device can sit on a command until its owner
//! presses a button. There is no mid-flight cancellation; abandoning the
//! future is the only way out.
//!
//! The trait takes `&mut self`: the device processes one command at a
//! time, so exclusive access is encoded in the type rather than guarded by
//! a lock.

use async_trait::async_trait;

use crate::apdu::{Apdu, ApduResponse};
use crate::error::Result;

/// A byte channel to a Ledger device.
#[async_trait]
pub trait Transport: Send {
    /// Sends an APDU command and waits for the device's response.
    ///
    /// # Errors
    ///
    /// Returns a transport-level error ([`crate::Error::Transport`] or
    /// [`crate::Error::MalformedResponse`]) if the channel fails; a
    /// response with a failure status word is *not* an `Err` at this layer.
    async fn exchange(&mut self, apdu: &Apdu) -> Result<ApduResponse>;
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::Error;

    /// A mock transport for testing.
    struct MockTransport {
        responses: VecDeque<ApduResponse>,
    }

    impl MockTransport {
        fn new(responses: Vec<ApduResponse>) -> Self {
            Self {
                responses: responses.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn exchange(&mut self, _apdu: &Apdu) -> Result<ApduResponse> {
            self.responses
                .pop_front()
                .ok_or_else(|| Error::Transport("no scripted response left".to_string()))
        }
    }

    #[tokio::test]
    async fn mock_transport_replays_responses() {
        let mut transport = MockTransport::new(vec![ApduResponse::new(vec![0x90, 0x00])]);

        let apdu = Apdu::new(0x11, 0x00, 0x00, 0x00, vec![]);
        let response = transport.exchange(&apdu).await.unwrap();
        assert!(response.is_success());

        let err = transport.exchange(&apdu).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
