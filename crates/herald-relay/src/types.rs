// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types of the relay HTTP API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct PairRequest<'a> {
    pub api_key: &'a str,
    pub tenant: &'a str,
}

/// Reply to a pairing request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairResponse {
    /// The device must scan `qr`; `number_key` becomes usable once it does.
    Qr { qr: String, number_key: String },
    /// The account is already linked.
    Connected { number_key: String },
}

#[derive(Debug, Serialize)]
pub struct NumberKeyRequest<'a> {
    pub api_key: &'a str,
    pub number_key: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Connected,
    Pending,
    LoggedOut,
}

#[derive(Debug, Deserialize)]
pub struct DeviceStatusResponse {
    pub status: DeviceState,
}

#[derive(Debug, Serialize)]
pub struct SendTextRequest<'a> {
    pub api_key: &'a str,
    pub number_key: &'a str,
    pub phone_no: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendImageRequest<'a> {
    pub api_key: &'a str,
    pub number_key: &'a str,
    pub phone_no: &'a str,
    pub url: &'a str,
    pub message: &'a str,
    /// "0" sends the caption with the image, "1" as a separate message.
    pub separate_caption: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SendFileRequest<'a> {
    pub api_key: &'a str,
    pub number_key: &'a str,
    pub phone_no: &'a str,
    pub url: &'a str,
    pub file_name: &'a str,
    pub message: &'a str,
}

/// Envelope of send and logout replies. `status` is a number or a numeric string.
#[derive(Debug, Deserialize)]
pub struct RelayReply {
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl RelayReply {
    pub fn is_ok(&self) -> bool {
        match &self.status {
            None => true,
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(200),
            Some(serde_json::Value::String(s)) => s == "200",
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_response_is_tagged_by_status() {
        let qr: PairResponse =
            serde_json::from_str(r#"{"status":"qr","qr":"2@abc","number_key":"nk1"}"#).unwrap();
        assert_eq!(
            qr,
            PairResponse::Qr {
                qr: "2@abc".into(),
                number_key: "nk1".into()
            }
        );
        let ok: PairResponse =
            serde_json::from_str(r#"{"status":"connected","number_key":"nk1"}"#).unwrap();
        assert_eq!(ok, PairResponse::Connected { number_key: "nk1".into() });
    }

    #[test]
    fn reply_status_accepts_number_or_string() {
        let parse = |s: &str| serde_json::from_str::<RelayReply>(s).unwrap().is_ok();
        assert!(parse(r#"{"status":200}"#));
        assert!(parse(r#"{"status":"200","message":"sent"}"#));
        assert!(parse(r#"{}"#));
        assert!(!parse(r#"{"status":"400","message":"invalid number"}"#));
    }
}
