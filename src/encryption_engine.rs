use base64::{
	alphabet,
	engine::{self, general_purpose},
	Engine,
};

pub const CUSTOM_ENGINE: engine::GeneralPurpose = engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);

const MAX_STEM_LEN: usize = 32;

/// Path-safe token for an uploaded file's original name.
pub fn encode_stem(stem: &str) -> String {
	let mut encoded = CUSTOM_ENGINE.encode(stem.as_bytes());
	encoded.truncate(MAX_STEM_LEN);
	if encoded.is_empty() {
		encoded.push_str("photo");
	}
	encoded
}
