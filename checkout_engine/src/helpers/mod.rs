mod payment_reference;

pub use payment_reference::{extract_payment_id, payment_reference, PAYMENT_REFERENCE_PREFIX};
