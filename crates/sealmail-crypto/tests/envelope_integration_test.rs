//! Integration tests for secure envelopes.
//!
//! This test suite validates:
//! - Seal/open roundtrips through the text body form
//! - Tamper detection on every envelope field
//! - Wrong-key rejection and the verify-before-decrypt order
//! - Envelope shape detection against plain four-line bodies
//! - Key files feeding the resolver

use sealmail_crypto::keys::save_private_key_with_params;
use sealmail_crypto::{
    base64_decode, base64_encode, open, save_public_key, seal, verify, CryptoError,
    FileKeyResolver, KdfParams, KeyResolver, Keypair, SecureEnvelope,
};
use tempfile::tempdir;

fn sealed_body(plaintext: &[u8], sender: &Keypair, recipient: &Keypair) -> String {
    seal(plaintext, &recipient.public, &sender.private)
        .unwrap()
        .to_body()
}

/// Flip one bit in the base64 payload of the given body line.
fn flip_bit(body: &str, line_index: usize, byte_index: usize) -> String {
    let mut lines: Vec<String> = body.lines().map(String::from).collect();
    let (tag, payload) = lines[line_index].split_once(' ').unwrap();
    let mut bytes = base64_decode(payload).unwrap();
    bytes[byte_index] ^= 0x01;
    lines[line_index] = format!("{} {}", tag, base64_encode(&bytes));
    lines.join("\n")
}

// ============================================================================
// Test Category 1: Roundtrips
// ============================================================================

#[test]
fn test_roundtrip_through_body_text() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    let body = sealed_body(b"Quarterly numbers attached.\nDo not forward.", &alice, &bob);
    let envelope = SecureEnvelope::from_lines(&body).unwrap();
    let plaintext = open(&envelope, &alice.public, &bob.private).unwrap();

    assert_eq!(plaintext, b"Quarterly numbers attached.\nDo not forward.");
}

#[test]
fn test_roundtrip_various_sizes() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    for size in [0usize, 1, 15, 16, 17, 1024, 64 * 1024] {
        let plaintext: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let body = sealed_body(&plaintext, &alice, &bob);
        let envelope = SecureEnvelope::from_lines(&body).unwrap();

        assert_eq!(
            open(&envelope, &alice.public, &bob.private).unwrap(),
            plaintext,
            "size {}",
            size
        );
    }
}

#[test]
fn test_body_never_contains_terminator_line() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    let body = sealed_body(b".\n.\n.", &alice, &bob);

    assert_eq!(body.lines().count(), 4);
    assert!(body.lines().all(|l| l != "."));
}

// ============================================================================
// Test Category 2: Tamper Detection
// ============================================================================

#[test]
fn test_any_ciphertext_bit_flip_fails_verification() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let body = sealed_body(b"pay 100 to carol", &alice, &bob);
    let ciphertext_len = SecureEnvelope::from_lines(&body).unwrap().ciphertext.len();

    for byte_index in 0..ciphertext_len {
        let tampered = SecureEnvelope::from_lines(&flip_bit(&body, 3, byte_index)).unwrap();
        let err = open(&tampered, &alice.public, &bob.private).unwrap_err();
        assert!(
            matches!(err, CryptoError::Verification),
            "byte {} gave {:?}",
            byte_index,
            err
        );
    }
}

#[test]
fn test_signature_bit_flip_fails_verification() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let body = sealed_body(b"hello", &alice, &bob);

    let tampered = SecureEnvelope::from_lines(&flip_bit(&body, 0, 10)).unwrap();

    assert!(matches!(
        open(&tampered, &alice.public, &bob.private),
        Err(CryptoError::Verification)
    ));
}

#[test]
fn test_iv_or_wrapped_key_tamper_fails_decryption() {
    // The signature covers the ciphertext only; a changed IV or wrapped key
    // is caught by the authenticated cipher.
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let body = sealed_body(b"hello", &alice, &bob);

    for line_index in [1, 2] {
        let tampered = SecureEnvelope::from_lines(&flip_bit(&body, line_index, 5)).unwrap();

        assert!(verify(&tampered, &alice.public).is_ok());
        assert!(matches!(
            open(&tampered, &alice.public, &bob.private),
            Err(CryptoError::Decryption(_))
        ));
    }
}

// ============================================================================
// Test Category 3: Wrong Keys
// ============================================================================

#[test]
fn test_wrong_sender_key_fails_verification() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let mallory = Keypair::generate();
    let envelope = seal(b"from alice", &bob.public, &alice.private).unwrap();

    assert!(matches!(
        open(&envelope, &mallory.public, &bob.private),
        Err(CryptoError::Verification)
    ));
}

#[test]
fn test_wrong_recipient_key_fails_decryption() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let eve = Keypair::generate();
    let envelope = seal(b"for bob only", &bob.public, &alice.private).unwrap();

    assert!(matches!(
        open(&envelope, &alice.public, &eve.private),
        Err(CryptoError::Decryption(_))
    ));
}

#[test]
fn test_verification_checked_before_decryption() {
    // Both keys wrong: the signature failure is reported, not the decryption failure.
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let eve = Keypair::generate();
    let envelope = seal(b"x", &bob.public, &alice.private).unwrap();

    assert!(matches!(
        open(&envelope, &eve.public, &eve.private),
        Err(CryptoError::Verification)
    ));
}

// ============================================================================
// Test Category 4: Shape Detection
// ============================================================================

#[test]
fn test_real_envelope_detected() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    assert!(SecureEnvelope::is_envelope(&sealed_body(b"hi", &alice, &bob)));
}

#[test]
fn test_adversarial_four_line_base64_body_is_plain() {
    // Four valid base64 lines of the right decoded sizes, but untagged.
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let body = sealed_body(b"hi", &alice, &bob);
    let plain: Vec<&str> = body.lines().map(|l| l.split_once(' ').unwrap().1).collect();
    let plain = plain.join("\n");

    assert_eq!(plain.lines().count(), 4);
    assert!(!SecureEnvelope::is_envelope(&plain));
    assert!(SecureEnvelope::from_lines(&plain).is_err());
}

#[test]
fn test_tagged_lines_with_garbage_payload_are_plain() {
    let body = "SM1-SIG hello\nSM1-IV world\nSM1-KEY this is\nSM1-DATA not base64!";
    assert!(!SecureEnvelope::is_envelope(body));
}

#[test]
fn test_envelope_with_trailing_newline_detected() {
    let alice = Keypair::generate();
    let bob = Keypair::generate();
    let body = format!("{}\n", sealed_body(b"hi", &alice, &bob));

    assert!(SecureEnvelope::is_envelope(&body));
}

// ============================================================================
// Test Category 5: Key Files
// ============================================================================

#[test]
fn test_resolved_file_keys_seal_and_open() {
    let dir = tempdir().unwrap();
    let alice = Keypair::generate();
    let bob = Keypair::generate();

    save_public_key(&alice.public, &dir.path().join("alice.pub"), Some("alice")).unwrap();
    save_public_key(&bob.public, &dir.path().join("bob.pub"), Some("bob")).unwrap();
    for (keypair, name) in [(&alice, "alice.key"), (&bob, "bob.key")] {
        save_private_key_with_params(
            &keypair.private,
            &dir.path().join(name),
            "twelve chars or more",
            KdfParams::low_memory(),
        )
        .unwrap();
    }

    let resolver = FileKeyResolver::new();
    let recipient = resolver.resolve_public(&dir.path().join("bob.pub")).unwrap();
    let sender = resolver
        .resolve_private(&dir.path().join("alice.key"), Some("twelve chars or more"))
        .unwrap();
    let body = seal(b"resolved", &recipient, &sender).unwrap().to_body();

    let sender_public = resolver.resolve_public(&dir.path().join("alice.pub")).unwrap();
    let recipient_private = resolver
        .resolve_private(&dir.path().join("bob.key"), Some("twelve chars or more"))
        .unwrap();
    let envelope = SecureEnvelope::from_lines(&body).unwrap();

    assert_eq!(
        open(&envelope, &sender_public, &recipient_private).unwrap(),
        b"resolved"
    );
}
