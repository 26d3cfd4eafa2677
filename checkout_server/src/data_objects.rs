use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The payment gateway's settlement notification.
///
/// The payment id travels embedded in `code` or `content`, whichever the gateway populated; the server hands
/// the populated one to the engine's reference parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentWebhook {
    /// The gateway's transaction id, used as the idempotency key.
    pub id: String,
    pub code: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "transferAmount")]
    pub transfer_amount: i64,
}

impl PaymentWebhook {
    /// The reference text carrying the embedded payment id, if the gateway sent one.
    pub fn reference(&self) -> Option<&str> {
        self.code.as_deref().or(self.content.as_deref())
    }
}
