use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use uuid::Uuid;

use crate::{Error, Result};

pub const CARD_UUID_LEN: usize = 22;

/// Public card key: 16 random bytes as unpadded URL-safe base64.
pub fn new_card_uuid() -> String {
	URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

pub fn is_card_uuid(value: &str) -> bool {
	value.len() == CARD_UUID_LEN
		&& value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

pub fn validate_card_uuid(value: &str) -> Result<()> {
	if !is_card_uuid(value) {
		return Err(Error::InvalidCardUuid { value: value.to_string() });
	}

	Ok(())
}
