//! # Gateway payment confirmation signatures
//!
//! When the customer completes payment on the gateway's checkout page, the gateway hands the storefront three
//! values: its own order id, a payment id, and a signature. The signature is an HMAC-SHA256 over the
//! concatenation
//!
//! ```text
//!     {gateway_order_id}|{gateway_payment_id}
//! ```
//!
//! keyed with the secret the storefront shares with the gateway, encoded as a lowercase hex digest. An order
//! is only confirmed once the supplied signature matches the digest we compute locally; anyone without the
//! secret cannot forge a confirmation.
//!
//! Verification is constant-time ([`hmac::Mac::verify_slice`]), so response timing reveals nothing about how
//! close a forged signature was to the real one.

use gfs_common::Secret;
use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Validates gateway payment confirmations against the shared gateway secret.
#[derive(Clone, Debug)]
pub struct PaymentVerifier {
    secret: Secret<String>,
}

impl PaymentVerifier {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    /// False when no gateway secret has been configured. Verification is refused outright in that case rather
    /// than silently accepting or rejecting everything.
    pub fn is_configured(&self) -> bool {
        !self.secret.reveal().is_empty()
    }

    fn mac(&self, gateway_order_id: &str, gateway_payment_id: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.reveal().as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(gateway_order_id.as_bytes());
        mac.update(b"|");
        mac.update(gateway_payment_id.as_bytes());
        mac
    }

    /// The hex digest we expect the gateway to have sent for this order/payment pair.
    pub fn expected_signature(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        let mac = self.mac(gateway_order_id, gateway_payment_id);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Checks a supplied signature in constant time. Malformed hex is an immediate rejection.
    pub fn verify(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        let sig_bytes = match hex::decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!("💳️ Supplied payment signature is not valid hex");
                return false;
            },
        };
        self.mac(gateway_order_id, gateway_payment_id).verify_slice(&sig_bytes).is_ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn verifier() -> PaymentVerifier {
        PaymentVerifier::new(Secret::new("s3cret".to_string()))
    }

    #[test]
    fn known_digest() {
        // Independently computed: HMAC-SHA256("s3cret", "order_abc|pay_xyz")
        let expected = "69d2d55b3175eb1d5c503399ed52b90c1f0326286864d5042cdf2c46598162e7";
        assert_eq!(verifier().expected_signature("order_abc", "pay_xyz"), expected);
        assert!(verifier().verify("order_abc", "pay_xyz", expected));
    }

    #[test]
    fn any_mutation_is_rejected() {
        let v = verifier();
        let good = v.expected_signature("order_abc", "pay_xyz");
        for i in 0..good.len() {
            let mut bad = good.clone().into_bytes();
            bad[i] = if bad[i] == b'0' { b'1' } else { b'0' };
            let bad = String::from_utf8(bad).unwrap();
            if bad == good {
                continue;
            }
            assert!(!v.verify("order_abc", "pay_xyz", &bad), "mutated signature at {i} must not verify");
        }
    }

    #[test]
    fn wrong_inputs_are_rejected() {
        let v = verifier();
        let good = v.expected_signature("order_abc", "pay_xyz");
        assert!(!v.verify("order_abc", "pay_xyz2", &good));
        assert!(!v.verify("order_abd", "pay_xyz", &good));
        assert!(!PaymentVerifier::new(Secret::new("other".to_string())).verify("order_abc", "pay_xyz", &good));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(!verifier().verify("order_abc", "pay_xyz", "not-hex-at-all"));
        assert!(!verifier().verify("order_abc", "pay_xyz", ""));
    }

    #[test]
    fn unconfigured_verifier_reports_it() {
        let v = PaymentVerifier::new(Secret::new(String::new()));
        assert!(!v.is_configured());
        assert!(verifier().is_configured());
    }
}
