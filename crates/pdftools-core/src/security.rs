//! Password protection and removal.
//!
//! Writes the standard security handler (V2, revision 3, RC4 128-bit)
//! with a single password used for both the user and owner slots, and
//! strips it again once the password has been verified.

use crate::codec;
use crate::crypto::{self, KEY_LEN};
use crate::document::DocumentHandle;
use crate::error::PdfToolError;
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// All reserved permission bits set, all grantable ones cleared.
const PERMISSION_BASE: u32 = 0xFFFF_F0C0;

/// Actions the password grants to a reader without the password.
///
/// Printing is allowed by default; copying and modifying are denied
/// unless explicitly enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Permissions {
    #[serde(default = "default_allow")]
    pub allow_print: bool,
    #[serde(default)]
    pub allow_copy: bool,
    #[serde(default)]
    pub allow_modify: bool,
}

fn default_allow() -> bool {
    true
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            allow_print: true,
            allow_copy: false,
            allow_modify: false,
        }
    }
}

impl Permissions {
    /// Encode the flags as the /P value of the encryption dictionary.
    pub fn flag_bits(&self) -> i32 {
        let mut bits = PERMISSION_BASE;
        if self.allow_print {
            // bit 3 plus bit 12 (faithful printing)
            bits |= 0x4 | 0x800;
        }
        if self.allow_modify {
            // bits 4, 6, 9 and 11
            bits |= 0x8 | 0x20 | 0x100 | 0x400;
        }
        if self.allow_copy {
            // bits 5 and 10
            bits |= 0x10 | 0x200;
        }
        bits as i32
    }
}

/// Encrypt a document in place with the given password.
///
/// The next [`DocumentHandle::save`] produces a file that requires the
/// password to open. Stream data is encrypted after any filters, so
/// existing compression is preserved.
pub fn protect(
    handle: &mut DocumentHandle,
    password: &str,
    permissions: &Permissions,
) -> Result<(), PdfToolError> {
    if password.is_empty() {
        return Err(PdfToolError::Validation(
            "A password is required to protect a document".into(),
        ));
    }
    if handle.document().is_encrypted() {
        return Err(PdfToolError::Validation(
            "Document is already password protected".into(),
        ));
    }

    // A stable file identifier derived from the current contents; it
    // feeds the key derivation and is written to the trailer.
    let mut probe = handle.document().clone();
    let snapshot = codec::encode(&mut probe)?;
    let file_id: [u8; 16] = Md5::digest(&snapshot).into();

    let owner = crypto::owner_hash(password.as_bytes(), password.as_bytes());
    let p = permissions.flag_bits();
    let key = crypto::file_key(password.as_bytes(), &owner, p, &file_id);
    let user = crypto::user_hash(&key, &file_id);

    let doc = handle.document_mut();
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    for id in ids {
        let object_key = crypto::object_key(&key, id);
        if let Some(object) = doc.objects.get_mut(&id) {
            crypt_object(object, &object_key);
        }
    }

    // The encryption dictionary itself stays in the clear, as does the
    // trailer; both are added after the object sweep above.
    let encrypt_id = doc.add_object(Dictionary::from_iter(vec![
        ("Filter", Object::Name(b"Standard".to_vec())),
        ("V", Object::Integer(2)),
        ("R", Object::Integer(3)),
        ("Length", Object::Integer(128)),
        ("P", Object::Integer(p as i64)),
        (
            "O",
            Object::String(owner.to_vec(), StringFormat::Hexadecimal),
        ),
        (
            "U",
            Object::String(user.to_vec(), StringFormat::Hexadecimal),
        ),
    ]));
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.to_vec(), StringFormat::Hexadecimal),
            Object::String(file_id.to_vec(), StringFormat::Hexadecimal),
        ]),
    );
    Ok(())
}

/// Verify the password against an encrypted file and return the
/// decrypted document.
pub fn unlock(name: &str, bytes: &[u8], password: &str) -> Result<DocumentHandle, PdfToolError> {
    let mut doc = codec::decode_encrypted(bytes)?;
    if !doc.is_encrypted() {
        return Err(PdfToolError::Validation(
            "Document is not password protected".into(),
        ));
    }

    let encrypt_ref = doc
        .trailer
        .get(b"Encrypt")
        .and_then(|o| o.as_reference())
        .map_err(|_| PdfToolError::CorruptDocument("Malformed encryption trailer".into()))?;
    let encrypt = doc
        .get_object(encrypt_ref)
        .and_then(|o| o.as_dict())
        .map_err(|_| PdfToolError::CorruptDocument("Malformed encryption dictionary".into()))?
        .clone();

    let filter = encrypt.get(b"Filter").and_then(|o| o.as_name());
    let version = encrypt.get(b"V").and_then(|o| o.as_i64()).unwrap_or(0);
    let revision = encrypt.get(b"R").and_then(|o| o.as_i64()).unwrap_or(0);
    let length = encrypt.get(b"Length").and_then(|o| o.as_i64()).unwrap_or(40);
    if !matches!(filter, Ok(b"Standard")) || version != 2 || revision != 3 || length != 128 {
        return Err(PdfToolError::Operation(
            "Unsupported encryption; only the standard RC4 128-bit handler can be removed".into(),
        ));
    }

    let owner_entry = entry_bytes(&encrypt, b"O")?;
    let user_entry = entry_bytes(&encrypt, b"U")?;
    let p = encrypt
        .get(b"P")
        .and_then(|o| o.as_i64())
        .map_err(|_| PdfToolError::CorruptDocument("Missing permission flags".into()))? as i32;
    let file_id = doc
        .trailer
        .get(b"ID")
        .and_then(|o| o.as_array())
        .ok()
        .and_then(|ids| ids.first())
        .and_then(|id| id.as_str().ok())
        .map(<[u8]>::to_vec)
        .unwrap_or_default();

    let key = crypto::file_key(password.as_bytes(), &owner_entry, p, &file_id);
    let candidate = crypto::user_hash(&key, &file_id);
    let mut first = [0u8; KEY_LEN];
    first.copy_from_slice(&candidate[..KEY_LEN]);
    if !crypto::verify_user_password(&first, &user_entry) {
        return Err(PdfToolError::IncorrectPassword);
    }

    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    for id in ids {
        if id == encrypt_ref {
            continue;
        }
        let object_key = crypto::object_key(&key, id);
        if let Some(object) = doc.objects.get_mut(&id) {
            crypt_object(object, &object_key);
        }
    }
    doc.objects.remove(&encrypt_ref);
    doc.trailer.remove(b"Encrypt");

    Ok(DocumentHandle::from_document(name, doc))
}

fn entry_bytes(encrypt: &Dictionary, key: &[u8]) -> Result<Vec<u8>, PdfToolError> {
    encrypt
        .get(key)
        .and_then(|o| o.as_str())
        .map(<[u8]>::to_vec)
        .map_err(|_| PdfToolError::CorruptDocument("Malformed encryption dictionary".into()))
}

/// RC4 every string and stream reachable from an object, in place.
/// Symmetric, so it serves both directions.
fn crypt_object(object: &mut Object, key: &[u8; KEY_LEN]) {
    match object {
        Object::String(bytes, _) => crypto::rc4_apply(key, bytes),
        Object::Array(items) => {
            for item in items {
                crypt_object(item, key);
            }
        }
        Object::Dictionary(dict) => crypt_dict(dict, key),
        Object::Stream(stream) => {
            crypt_dict(&mut stream.dict, key);
            crypto::rc4_apply(key, &mut stream.content);
        }
        _ => {}
    }
}

fn crypt_dict(dict: &mut Dictionary, key: &[u8; KEY_LEN]) {
    for (_, value) in dict.iter_mut() {
        crypt_object(value, key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdoc::{create_test_pdf, page_texts};
    use pretty_assertions::assert_eq;

    fn protected_bytes(pages: u32, password: &str) -> Vec<u8> {
        let bytes = create_test_pdf(pages, "Sec");
        let mut handle = DocumentHandle::load("sec.pdf", &bytes).unwrap();
        protect(&mut handle, password, &Permissions::default()).unwrap();
        handle.save().unwrap()
    }

    #[test]
    fn protect_round_trips_through_unlock() {
        let locked = protected_bytes(3, "hunter2");

        let err = codec::decode(&locked).unwrap_err();
        assert!(matches!(err, PdfToolError::PasswordRequired));

        let mut unlocked = unlock("sec.pdf", &locked, "hunter2").unwrap();
        assert_eq!(unlocked.page_count(), 3);
        let bytes = unlocked.save().unwrap();
        let texts = page_texts(&bytes);
        assert!(texts[0].contains("Sec-Page-1"));
        assert!(texts[2].contains("Sec-Page-3"));
    }

    #[test]
    fn unlock_rejects_the_wrong_password() {
        let locked = protected_bytes(1, "right");
        let err = unlock("sec.pdf", &locked, "wrong").unwrap_err();
        assert!(matches!(err, PdfToolError::IncorrectPassword));
    }

    #[test]
    fn unlock_rejects_an_unencrypted_file() {
        let bytes = create_test_pdf(1, "Sec");
        let err = unlock("sec.pdf", &bytes, "whatever").unwrap_err();
        assert!(matches!(err, PdfToolError::Validation(_)));
    }

    #[test]
    fn protect_requires_a_password() {
        let bytes = create_test_pdf(1, "Sec");
        let mut handle = DocumentHandle::load("sec.pdf", &bytes).unwrap();
        let err = protect(&mut handle, "", &Permissions::default()).unwrap_err();
        assert!(matches!(err, PdfToolError::Validation(_)));
    }

    #[test]
    fn protect_refuses_double_encryption() {
        let locked = protected_bytes(1, "pw");
        let mut handle =
            DocumentHandle::from_document("sec.pdf", codec::decode_encrypted(&locked).unwrap());
        let err = protect(&mut handle, "pw2", &Permissions::default()).unwrap_err();
        assert!(matches!(err, PdfToolError::Validation(_)));
    }

    #[test]
    fn default_permissions_allow_print_only() {
        let p = Permissions::default().flag_bits();
        assert_ne!(p & 0x4, 0);
        assert_eq!(p & 0x10, 0);
        assert_eq!(p & 0x8, 0);
    }

    #[test]
    fn permission_flags_set_the_documented_bits() {
        let all = Permissions {
            allow_print: true,
            allow_copy: true,
            allow_modify: true,
        }
        .flag_bits();
        assert_ne!(all & 0x10, 0);
        assert_ne!(all & 0x8, 0);
        // reserved high bits always set
        assert!(all < 0);
    }

    #[test]
    fn permissions_deserialize_with_defaults() {
        let p: Permissions = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Permissions::default());
        let p: Permissions = serde_json::from_str(r#"{"allow_copy":true}"#).unwrap();
        assert!(p.allow_copy && p.allow_print && !p.allow_modify);
    }
}
