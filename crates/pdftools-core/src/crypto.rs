//! Standard security handler primitives (revision 3, RC4 128-bit).
//!
//! Implements the password algorithms from the PDF 1.7 reference:
//! Algorithm 2 (file key), Algorithm 3 (/O), Algorithm 5 (/U) and the
//! per-object key schedule used by the RC4 filters.

use md5::{Digest, Md5};
use rc4::{consts::U16, KeyInit, Rc4, StreamCipher};

/// Standard padding string applied to every password before hashing.
pub const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

/// File key length in bytes (128-bit keys).
pub const KEY_LEN: usize = 16;

/// Pad or truncate a password to exactly 32 bytes.
fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PAD[..32 - len]);
    padded
}

/// Algorithm 3: derive the /O entry from the owner and user passwords.
pub fn owner_hash(owner_password: &[u8], user_password: &[u8]) -> [u8; 32] {
    let mut digest: [u8; KEY_LEN] = Md5::digest(pad_password(owner_password)).into();
    for _ in 0..50 {
        digest = Md5::digest(digest).into();
    }

    let mut value = pad_password(user_password);
    rc4_apply(&digest, &mut value);
    for round in 1..=19u8 {
        let mut round_key = digest;
        for byte in round_key.iter_mut() {
            *byte ^= round;
        }
        rc4_apply(&round_key, &mut value);
    }
    value
}

/// Algorithm 2: derive the file encryption key from the user password.
pub fn file_key(
    user_password: &[u8],
    owner_entry: &[u8],
    permissions: i32,
    file_id: &[u8],
) -> [u8; KEY_LEN] {
    let mut hasher = Md5::new();
    hasher.update(pad_password(user_password));
    hasher.update(owner_entry);
    hasher.update((permissions as u32).to_le_bytes());
    hasher.update(file_id);
    let mut key: [u8; KEY_LEN] = hasher.finalize().into();

    // Revision 3 re-hashes the key 50 times.
    for _ in 0..50 {
        key = Md5::digest(key).into();
    }
    key
}

/// Algorithm 5: derive the /U entry; only the first 16 bytes are
/// significant, the tail is padding.
pub fn user_hash(key: &[u8; KEY_LEN], file_id: &[u8]) -> [u8; 32] {
    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PAD);
    hasher.update(file_id);
    let mut digest: [u8; KEY_LEN] = hasher.finalize().into();

    rc4_apply(key, &mut digest);
    for round in 1..=19u8 {
        let mut round_key = *key;
        for byte in round_key.iter_mut() {
            *byte ^= round;
        }
        rc4_apply(&round_key, &mut digest);
    }

    let mut value = [0u8; 32];
    value[..KEY_LEN].copy_from_slice(&digest);
    value
}

/// Check a candidate user password against a file's /U entry.
pub fn verify_user_password(candidate: &[u8; KEY_LEN], user_entry: &[u8]) -> bool {
    user_entry.len() >= KEY_LEN && candidate[..] == user_entry[..KEY_LEN]
}

/// Per-object RC4 key: md5 of the file key plus the low bytes of the
/// object number and generation. With 128-bit file keys the result is
/// always the full 16-byte digest.
pub fn object_key(key: &[u8; KEY_LEN], object_id: (u32, u16)) -> [u8; KEY_LEN] {
    let (number, generation) = object_id;
    let mut hasher = Md5::new();
    hasher.update(key);
    hasher.update(&number.to_le_bytes()[..3]);
    hasher.update(generation.to_le_bytes());
    hasher.finalize().into()
}

/// RC4 is symmetric, so this both encrypts and decrypts in place.
pub fn rc4_apply(key: &[u8; KEY_LEN], data: &mut [u8]) {
    let mut cipher = Rc4::<U16>::new(key.into());
    cipher.apply_keystream(data);
}
