//! Request signing for the Netstorage HTTP API.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const ACTION_HEADER: &str = "X-Akamai-ACS-Action";
pub const AUTH_DATA_HEADER: &str = "X-Akamai-ACS-Auth-Data";
pub const AUTH_SIGN_HEADER: &str = "X-Akamai-ACS-Auth-Sign";

/// Action sent for both PUT and DELETE; the HTTP method tells them apart.
pub const UPLOAD_ACTION: &str = "version=1&action=upload";

/// Header values authenticating a single Netstorage request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub action: String,
    pub auth_data: String,
    pub auth_sign: String,
}

impl AuthHeaders {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (ACTION_HEADER, self.action.as_str()),
            (AUTH_DATA_HEADER, self.auth_data.as_str()),
            (AUTH_SIGN_HEADER, self.auth_sign.as_str()),
        ]
        .into_iter()
    }
}

/// Sign an upload-class request for `storage_path` at `unix_time`.
///
/// The signature is a base64 HMAC-SHA256, keyed by `secret`, over
/// `"{auth_data}/{storage_path}\nx-akamai-acs-action:{action}\n"`.
pub fn sign_upload(
    key_name: &str,
    secret: &str,
    id: &str,
    storage_path: &str,
    unix_time: i64,
) -> AuthHeaders {
    let auth_data = format!(
        "5, 0.0.0.0, 0.0.0.0, {}, {}, {}",
        unix_time, id, key_name
    );

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(
        format!(
            "{}/{}\nx-akamai-acs-action:{}\n",
            auth_data, storage_path, UPLOAD_ACTION
        )
        .as_bytes(),
    );
    let auth_sign = STANDARD.encode(mac.finalize().into_bytes());

    AuthHeaders {
        action: UPLOAD_ACTION.to_string(),
        auth_data,
        auth_sign,
    }
}
