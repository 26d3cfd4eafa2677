/// The fixed token that precedes the payment id in a transfer reference.
pub const PAYMENT_REFERENCE_PREFIX: &str = "PMT-";

/// The reference string a buyer is asked to attach to their transfer for the given payment.
pub fn payment_reference(payment_id: i64) -> String {
    format!("{PAYMENT_REFERENCE_PREFIX}{payment_id}")
}

/// Extracts the payment id from free-form transfer reference text.
///
/// Gateways forward the reference in slightly different shapes (bare, or embedded in surrounding text), so
/// this scans for the first `PMT-<digits>` token rather than requiring an exact match.
pub fn extract_payment_id(reference: &str) -> Option<i64> {
    let token = regex::Regex::new(r"PMT-(\d+)").unwrap();
    token.captures(reference).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse::<i64>().ok())
}
