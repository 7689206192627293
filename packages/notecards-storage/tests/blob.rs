use uuid::Uuid;

use notecards_storage::{Error, blob::BlobStore};

const CARD_UUID: &str = "AbC_defghijklmnopqrstu";

#[tokio::test]
async fn blobs_round_trip_and_never_overwrite() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let store = BlobStore::new(dir.path());
	let user_id = Uuid::new_v4();
	let first =
		store.write(CARD_UUID, user_id, "notes.txt", b"one").await.expect("Failed to write blob.");
	let second =
		store.write(CARD_UUID, user_id, "notes.txt", b"two").await.expect("Failed to write blob.");

	assert_eq!(first, format!("A/b/C/{CARD_UUID}/{user_id}/files/notes.txt"));
	assert_ne!(first, second);
	assert!(second.ends_with(".txt"));
	assert_eq!(store.read(&first).await.expect("Failed to read blob."), b"one");
	assert_eq!(store.read(&second).await.expect("Failed to read blob."), b"two");

	store.remove(&first).await.expect("Failed to remove blob.");
	store.remove(&first).await.expect("Removing twice must be a no-op.");

	assert!(matches!(store.read(&first).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn blobs_reject_bad_card_uuids() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let store = BlobStore::new(dir.path());
	let result = store.write("../../escape", Uuid::new_v4(), "x", b"x").await;

	assert!(matches!(result, Err(Error::InvalidArgument(_))));
}
