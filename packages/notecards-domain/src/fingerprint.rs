/// Change-detection hash over a card's text and its attachments' content hashes, in attachment
/// order. Fields are NUL separated so that moving text between fields changes the digest.
pub fn content_fingerprint<'a, I>(title: &str, query: &str, answer: &str, file_hashes: I) -> String
where
	I: IntoIterator<Item = &'a str>,
{
	let mut hasher = blake3::Hasher::new();

	for part in [title, query, answer] {
		hasher.update(part.as_bytes());
		hasher.update(&[0]);
	}
	for hash in file_hashes {
		hasher.update(hash.as_bytes());
		hasher.update(&[0]);
	}

	hasher.finalize().to_hex().to_string()
}

pub fn blob_hash(bytes: &[u8]) -> String {
	blake3::hash(bytes).to_hex().to_string()
}
