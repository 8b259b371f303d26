//! Persistence boundary for locally generated signer credentials.
//!
//! The connector never interprets the stored material and never chooses the
//! medium; it only round-trips opaque bytes so the embedded signer survives
//! restarts. Format and storage are the application's concern.

use async_trait::async_trait;

/// Application-provided storage for embedded-signer key material.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Previously saved material, if any.
    async fn load(&self) -> anyhow::Result<Option<Vec<u8>>>;

    /// Persist `material`, replacing anything stored before.
    async fn save(&self, material: &[u8]) -> anyhow::Result<()>;
}

/// Load existing credential material, or generate and persist fresh material
/// exactly once.
///
/// `generate` is only invoked when the store is empty; a save failure
/// propagates before the material is ever used.
pub async fn load_or_create(
    store: &dyn CredentialStore,
    generate: impl FnOnce() -> Vec<u8>,
) -> anyhow::Result<Vec<u8>> {
    if let Some(material) = store.load().await? {
        return Ok(material);
    }
    let material = generate();
    store.save(&material).await?;
    Ok(material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        material: Mutex<Option<Vec<u8>>>,
        fail_save: bool,
    }

    #[async_trait]
    impl CredentialStore for MemoryStore {
        async fn load(&self) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.material.lock().unwrap().clone())
        }

        async fn save(&self, material: &[u8]) -> anyhow::Result<()> {
            if self.fail_save {
                anyhow::bail!("disk full");
            }
            *self.material.lock().unwrap() = Some(material.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_generates_once_then_loads() {
        let store = MemoryStore::default();
        let generated = AtomicUsize::new(0);

        let first = load_or_create(&store, || {
            generated.fetch_add(1, Ordering::SeqCst);
            vec![1, 2, 3]
        })
        .await
        .unwrap();
        let second = load_or_create(&store, || {
            generated.fetch_add(1, Ordering::SeqCst);
            vec![9, 9, 9]
        })
        .await
        .unwrap();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, first, "second call must load, not regenerate");
        assert_eq!(generated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_save_failure_propagates() {
        let store = MemoryStore {
            fail_save: true,
            ..Default::default()
        };
        let result = load_or_create(&store, || vec![1]).await;
        assert!(result.is_err());
    }
}
