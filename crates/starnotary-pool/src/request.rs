//! Challenge and authorization records handed to clients.

use serde::{Deserialize, Serialize};

use starnotary_core::WalletAddress;

/// Suffix of every challenge message.
pub const MESSAGE_SUFFIX: &str = "starRegistry";

/// Build the message a wallet must sign to prove control of `address`.
pub fn challenge_message(address: &WalletAddress, request_time_stamp: i64) -> String {
    format!("{}:{}:{}", address, request_time_stamp, MESSAGE_SUFFIX)
}

/// An open challenge for a wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub wallet_address: WalletAddress,

    /// Unix seconds at which the challenge was issued.
    pub request_time_stamp: i64,

    /// The exact text to sign.
    pub message: String,

    /// Whole seconds left before the challenge expires.
    pub validation_window: u64,
}

/// Details of a verified challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRequest {
    pub address: WalletAddress,
    pub request_time_stamp: i64,
    pub message: String,

    /// Seconds that were left on the challenge when it was verified.
    pub validation_window: u64,

    /// Always true: the signature matched.
    pub message_signature: bool,
}

/// Proof that an address may register one star.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatus {
    pub register_star: bool,
    pub status: ValidatedRequest,
}

impl ValidationStatus {
    /// Build the status of a successfully verified challenge.
    pub fn authorized(request: ValidationRequest) -> Self {
        Self {
            register_star: true,
            status: ValidatedRequest {
                address: request.wallet_address,
                request_time_stamp: request.request_time_stamp,
                message: request.message,
                validation_window: request.validation_window,
                message_signature: true,
            },
        }
    }

    /// The authorized address.
    pub fn address(&self) -> &WalletAddress {
        &self.status.address
    }
}

/// Outcome of a signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The signature matched; the address may now register one star.
    Authorized(ValidationStatus),
    /// The signature did not match. The challenge stays open.
    Invalid,
    /// There is no open challenge for the address.
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_message_format() {
        let address = WalletAddress::new("0xabc");
        assert_eq!(
            challenge_message(&address, 1_541_605_128),
            "0xabc:1541605128:starRegistry"
        );
    }

    #[test]
    fn test_status_json_shape() {
        let request = ValidationRequest {
            wallet_address: WalletAddress::new("0xabc"),
            request_time_stamp: 1_541_605_128,
            message: "0xabc:1541605128:starRegistry".into(),
            validation_window: 193,
        };
        let json = serde_json::to_value(ValidationStatus::authorized(request)).unwrap();

        assert_eq!(json["registerStar"], true);
        assert_eq!(json["status"]["address"], "0xabc");
        assert_eq!(json["status"]["requestTimeStamp"], 1_541_605_128);
        assert_eq!(json["status"]["validationWindow"], 193);
        assert_eq!(json["status"]["messageSignature"], true);
    }

    #[test]
    fn test_request_json_shape() {
        let request = ValidationRequest {
            wallet_address: WalletAddress::new("0xabc"),
            request_time_stamp: 7,
            message: "0xabc:7:starRegistry".into(),
            validation_window: 300,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["walletAddress"], "0xabc");
        assert_eq!(json["validationWindow"], 300);
    }
}
