//! Directory-backed attachment storage.
//!
//! Blobs live under `{root}/{u0}/{u1}/{u2}/{card_uuid}/{user_id}/files/{name}` where `u0..u2` are
//! the first three characters of the card uuid. Stored paths are relative to the root.

use std::{
	io::ErrorKind,
	path::{Component, Path, PathBuf},
};

use rand::{Rng, distributions::Alphanumeric};
use tokio::{
	fs,
	io::{AsyncWrite, AsyncWriteExt},
};
use uuid::Uuid;

use crate::{Error, Result};

const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Clone, Debug)]
pub struct BlobStore {
	root: PathBuf,
}
impl BlobStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn from_config(cfg: &notecards_config::Files) -> Self {
		Self::new(cfg.root.clone())
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub async fn ensure_root(&self) -> Result<()> {
		fs::create_dir_all(&self.root).await?;

		Ok(())
	}

	/// Writes `bytes` under a fresh name and returns the stored relative path.
	///
	/// An existing file with the same name is never overwritten; a random suffix is added to the
	/// stem instead.
	pub async fn write(
		&self,
		card_uuid: &str,
		user_id: Uuid,
		file_name: &str,
		bytes: &[u8],
	) -> Result<String> {
		let dir = card_dir(card_uuid, user_id)?;
		let name = sanitize_file_name(file_name);

		fs::create_dir_all(self.root.join(&dir)).await?;

		for attempt in 0..MAX_NAME_ATTEMPTS {
			let candidate = if attempt == 0 { name.clone() } else { with_suffix(&name) };
			let relative = format!("{dir}/{candidate}");
			let opened = fs::OpenOptions::new()
				.write(true)
				.create_new(true)
				.open(self.root.join(&relative))
				.await;
			let file = match opened {
				Ok(file) => file,
				Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
				Err(err) => return Err(err.into()),
			};

			write_or_discard(file, &self.root.join(&relative), bytes).await?;

			tracing::debug!(
				storage_path = %relative,
				size = bytes.len(),
				"Stored attachment blob."
			);

			return Ok(relative);
		}

		Err(Error::Conflict(format!("No free file name for {name:?}.")))
	}

	pub async fn read(&self, storage_path: &str) -> Result<Vec<u8>> {
		let path = self.resolve(storage_path)?;

		match fs::read(&path).await {
			Ok(bytes) => Ok(bytes),
			Err(err) if err.kind() == ErrorKind::NotFound =>
				Err(Error::NotFound(format!("Blob {storage_path} is missing."))),
			Err(err) => Err(err.into()),
		}
	}

	/// Removes a blob. A blob that is already gone is not an error.
	pub async fn remove(&self, storage_path: &str) -> Result<()> {
		let path = self.resolve(storage_path)?;

		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}

	/// Joins a stored relative path onto the root, refusing anything that could escape it.
	pub fn resolve(&self, storage_path: &str) -> Result<PathBuf> {
		let relative = Path::new(storage_path);

		if storage_path.is_empty()
			|| !relative.components().all(|component| matches!(component, Component::Normal(_)))
		{
			return Err(Error::InvalidArgument(format!("Invalid storage path {storage_path:?}.")));
		}

		Ok(self.root.join(relative))
	}
}

/// Keeps the last path segment of an uploaded name and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(raw: &str) -> String {
	let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
	let cleaned: String = base
		.chars()
		.map(|ch| {
			if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') { ch } else { '_' }
		})
		.collect();
	let cleaned = cleaned.trim_start_matches('.');

	if cleaned.is_empty() { "file".to_string() } else { cleaned.to_string() }
}

fn card_dir(card_uuid: &str, user_id: Uuid) -> Result<String> {
	if !notecards_domain::ids::is_card_uuid(card_uuid) {
		return Err(Error::InvalidArgument(format!("Invalid card uuid {card_uuid:?}.")));
	}

	let prefix = &card_uuid[..3];
	let mut chars = prefix.chars();
	let (Some(a), Some(b), Some(c)) = (chars.next(), chars.next(), chars.next()) else {
		return Err(Error::InvalidArgument(format!("Invalid card uuid {card_uuid:?}.")));
	};

	Ok(format!("{a}/{b}/{c}/{card_uuid}/{user_id}/files"))
}

/// Writes `bytes` to the freshly created `path`. A partial file is removed before the error is
/// returned.
async fn write_or_discard<W>(mut writer: W, path: &Path, bytes: &[u8]) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	let written = match writer.write_all(bytes).await {
		Ok(()) => writer.flush().await,
		Err(err) => Err(err),
	};

	drop(writer);

	if let Err(err) = written {
		if let Err(remove_err) = fs::remove_file(path).await {
			tracing::warn!(
				error = %remove_err,
				path = %path.display(),
				"Failed to remove partial blob."
			);
		}

		return Err(err.into());
	}

	Ok(())
}

fn with_suffix(name: &str) -> String {
	let suffix: String =
		rand::thread_rng().sample_iter(&Alphanumeric).take(7).map(char::from).collect();

	match name.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
		_ => format!("{name}_{suffix}"),
	}
}

#[cfg(test)]
mod tests {
	use std::{
		io,
		pin::Pin,
		task::{Context, Poll},
	};

	use super::*;

	struct FullDisk;
	impl AsyncWrite for FullDisk {
		fn poll_write(
			self: Pin<&mut Self>,
			_: &mut Context<'_>,
			_: &[u8],
		) -> Poll<io::Result<usize>> {
			Poll::Ready(Err(io::Error::other("No space left on device.")))
		}

		fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
			Poll::Ready(Ok(()))
		}

		fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
			Poll::Ready(Ok(()))
		}
	}

	#[tokio::test]
	async fn failed_write_leaves_no_partial_file() {
		let dir = tempfile::tempdir().expect("Failed to create temp dir.");
		let path = dir.path().join("partial.bin");

		fs::write(&path, b"half").await.expect("Failed to seed file.");

		let err = write_or_discard(FullDisk, &path, b"payload")
			.await
			.expect_err("A failing writer must surface its error.");

		assert!(matches!(err, Error::Io(_)));
		assert!(!path.exists());
	}

	#[tokio::test]
	async fn successful_write_keeps_the_file() {
		let dir = tempfile::tempdir().expect("Failed to create temp dir.");
		let path = dir.path().join("whole.bin");
		let file = fs::File::create(&path).await.expect("Failed to create file.");

		write_or_discard(file, &path, b"payload").await.expect("Write must succeed.");

		assert_eq!(fs::read(&path).await.expect("Failed to read file."), b"payload");
	}

	#[test]
	fn file_names_are_sanitized() {
		assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
		assert_eq!(sanitize_file_name("C:\\tmp\\my photo.png"), "my_photo.png");
		assert_eq!(sanitize_file_name(".."), "file");
		assert_eq!(sanitize_file_name(""), "file");
	}

	#[test]
	fn resolve_refuses_escapes() {
		let store = BlobStore::new("/srv/media");

		assert!(store.resolve("../secret").is_err());
		assert!(store.resolve("/etc/passwd").is_err());
		assert!(store.resolve("").is_err());
		assert_eq!(
			store.resolve("a/b/c/file.txt").expect("Path must resolve."),
			PathBuf::from("/srv/media/a/b/c/file.txt")
		);
	}

	#[test]
	fn suffix_keeps_extension() {
		let renamed = with_suffix("notes.txt");

		assert!(renamed.starts_with("notes_"));
		assert!(renamed.ends_with(".txt"));
		assert_eq!(renamed.len(), "notes_.txt".len() + 7);
	}
}
