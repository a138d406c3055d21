use haven_crypto::{
    CipherScheme, CryptoError, CryptoResult, FallbackKdfParams, FallbackKeyMaterial,
    KeyedPlatform, PlatformEncryption, SafeStorage, StringEncryptor, UnavailablePlatform,
    generate_random_key,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn material(machine: &str) -> FallbackKeyMaterial {
    FallbackKeyMaterial {
        machine_id: machine.to_string(),
        platform: "linux".to_string(),
        app_version: "0.4.0".to_string(),
    }
}

fn keyed_storage() -> SafeStorage {
    SafeStorage::new(
        Arc::new(KeyedPlatform::new(generate_random_key())),
        material("machine-a"),
        FallbackKdfParams::default(),
    )
}

fn fallback_storage(machine: &str) -> SafeStorage {
    SafeStorage::new(
        Arc::new(UnavailablePlatform),
        material(machine),
        FallbackKdfParams::default(),
    )
}

/// Platform that claims availability but refuses every operation.
struct BrokenPlatform {
    attempts: AtomicUsize,
}

impl PlatformEncryption for BrokenPlatform {
    fn encrypt_string(&self, _plaintext: &str) -> CryptoResult<Vec<u8>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CryptoError::Encryption("secure enclave busy".into()))
    }

    fn decrypt_string(&self, _data: &[u8]) -> CryptoResult<String> {
        Err(CryptoError::Decryption("secure enclave busy".into()))
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ── Platform path ────────────────────────────────────────────────

#[test]
fn platform_roundtrip_uses_platform_tag() {
    let storage = keyed_storage();
    let ct = storage.encrypt("sk-live-123").unwrap();
    assert_eq!(CipherScheme::of(&ct), Some(CipherScheme::Platform));
    assert!(!ct.contains("sk-live-123"));
    assert_eq!(storage.decrypt(&ct).unwrap(), "sk-live-123");
}

#[test]
fn platform_ciphertexts_are_randomized() {
    let storage = keyed_storage();
    let a = storage.encrypt("same").unwrap();
    let b = storage.encrypt("same").unwrap();
    assert_ne!(a, b);
}

#[test]
fn platform_failure_falls_back_to_software() {
    let platform = Arc::new(BrokenPlatform {
        attempts: AtomicUsize::new(0),
    });
    let storage = SafeStorage::new(
        platform.clone(),
        material("machine-a"),
        FallbackKdfParams::default(),
    );
    let ct = storage.encrypt("token").unwrap();
    assert_eq!(platform.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(CipherScheme::of(&ct), Some(CipherScheme::Fallback));
    assert_eq!(storage.decrypt(&ct).unwrap(), "token");
}

#[test]
fn platform_ciphertext_unreadable_when_platform_goes_away() {
    let key = generate_random_key();
    let writer = SafeStorage::new(
        Arc::new(KeyedPlatform::new(key)),
        material("machine-a"),
        FallbackKdfParams::default(),
    );
    let ct = writer.encrypt("secret").unwrap();

    let reader = fallback_storage("machine-a");
    let err = reader.decrypt(&ct).unwrap_err();
    assert!(err.is_unrecoverable_value());
}

// ── Fallback path ────────────────────────────────────────────────

#[test]
fn unavailable_platform_uses_fallback() {
    let storage = fallback_storage("machine-a");
    assert!(!storage.is_available());
    let ct = storage.encrypt("hello").unwrap();
    assert!(ct.starts_with("f1:"));
    assert_eq!(storage.decrypt(&ct).unwrap(), "hello");
}

#[test]
fn fallback_is_readable_by_same_machine() {
    let ct = fallback_storage("machine-a").encrypt("bookmark data").unwrap();
    assert_eq!(
        fallback_storage("machine-a").decrypt(&ct).unwrap(),
        "bookmark data"
    );
}

#[test]
fn fallback_breaks_when_machine_identity_changes() {
    let ct = fallback_storage("machine-a").encrypt("bookmark data").unwrap();
    let err = fallback_storage("machine-b").decrypt(&ct).unwrap_err();
    assert!(matches!(err, CryptoError::Decryption(_)));
}

#[test]
fn fallback_construction_failure_is_fatal_for_encrypt() {
    let storage = SafeStorage::new(
        Arc::new(UnavailablePlatform),
        material(""),
        FallbackKdfParams::default(),
    );
    let err = storage.encrypt("anything").unwrap_err();
    assert!(matches!(err, CryptoError::Unavailable(_)));
}

#[test]
fn weak_iteration_count_is_rejected() {
    let storage = SafeStorage::new(
        Arc::new(UnavailablePlatform),
        material("machine-a"),
        FallbackKdfParams { iterations: 1_000 },
    );
    assert!(matches!(
        storage.encrypt("x").unwrap_err(),
        CryptoError::Unavailable(_)
    ));
}

// ── Malformed input ──────────────────────────────────────────────

#[test]
fn untagged_ciphertext_is_decryption_error() {
    let storage = keyed_storage();
    assert!(matches!(
        storage.decrypt("plain text").unwrap_err(),
        CryptoError::Decryption(_)
    ));
}

#[test]
fn unknown_tag_is_decryption_error() {
    let storage = keyed_storage();
    assert!(matches!(
        storage.decrypt("z9:AAAA").unwrap_err(),
        CryptoError::Decryption(_)
    ));
}

#[test]
fn bad_base64_is_decryption_error() {
    let storage = keyed_storage();
    assert!(matches!(
        storage.decrypt("p1:!!!not base64!!!").unwrap_err(),
        CryptoError::Decryption(_)
    ));
}

#[test]
fn tampered_ciphertext_is_rejected() {
    let storage = fallback_storage("machine-a");
    let mut ct = storage.encrypt("payload").unwrap().into_bytes();
    let last = ct.len() - 2;
    ct[last] = if ct[last] == b'A' { b'B' } else { b'A' };
    let ct = String::from_utf8(ct).unwrap();
    assert!(storage.decrypt(&ct).is_err());
}

#[test]
fn empty_string_roundtrips() {
    let storage = keyed_storage();
    let ct = storage.encrypt("").unwrap();
    assert_eq!(storage.decrypt(&ct).unwrap(), "");
}
