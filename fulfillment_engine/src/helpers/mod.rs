mod order_ids;
mod payment_signature;

pub use order_ids::new_order_id;
pub use payment_signature::PaymentVerifier;
