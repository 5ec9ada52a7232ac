use rand::{distributions::Alphanumeric, Rng};

/// Generates a new public order id. Opaque, assigned once at creation.
pub fn new_order_id() -> String {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(10).map(|c| (c as char).to_ascii_uppercase()).collect();
    format!("ORD-{suffix}")
}

/// Generates a transaction reference for a new payment attempt. References are never reused, even for the same
/// order; gateways reject replayed identifiers with conflict errors.
pub fn new_transaction_ref(order_id: &str) -> String {
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect();
    format!("{order_id}-{suffix}")
}
