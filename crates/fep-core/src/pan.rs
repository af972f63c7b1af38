//! PAN (card number) masking and hashing helpers.
//!
//! HSM-backed encryption is an external collaborator (§1 "Out of scope"):
//! this module only provides the two derived forms every persisted record
//! needs regardless of which cipher is plugged in — a display mask and a
//! deterministic lookup hash (§3, §8 property 10).

/// Encrypts/decrypts PANs for storage. Implemented by the embedding
/// application against its HSM or KMS; this crate never sees a cleartext
/// PAN after the processor hands the encrypted form to the repository.
pub trait PanCipher: Send + Sync {
    fn encrypt(&self, pan: &str) -> Vec<u8>;
    fn decrypt(&self, ciphertext: &[u8]) -> Option<String>;
}

/// Deterministic PAN hash for equality lookups (`findByMaskedPanAndDateRange`
/// and duplicate-detection style queries don't need the hash, but anything
/// matching "same card" across records does).
pub fn hash(pan: &str) -> String {
    blake3::hash(pan.as_bytes()).to_hex().to_string()
}

/// Display mask: first 6 (issuer/BIN) and last 4 digits visible, the rest
/// replaced with `*`. PANs shorter than 10 digits are masked in full except
/// the last 4, to avoid ever reconstructing a short PAN from the mask.
pub fn mask(pan: &str) -> String {
    let len = pan.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let visible_head = if len >= 10 { 6 } else { 0 };
    let visible_tail = 4;
    let masked_len = len.saturating_sub(visible_head + visible_tail);

    let chars: Vec<char> = pan.chars().collect();
    let head: String = chars[..visible_head].iter().collect();
    let tail: String = chars[len - visible_tail..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(masked_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_standard_pan() {
        assert_eq!(mask("4111111111111111"), "411111*******1111");
    }

    #[test]
    fn masks_short_pan_fully_except_tail() {
        assert_eq!(mask("123456789"), "*****6789");
    }

    #[test]
    fn masks_very_short_pan() {
        assert_eq!(mask("123"), "***");
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash("4111111111111111"), hash("4111111111111111"));
    }

    #[test]
    fn hash_differs_across_pans() {
        assert_ne!(hash("4111111111111111"), hash("4222222222222222"));
    }

    #[test]
    fn mask_never_reproduces_cleartext() {
        let pan = "4111111111111111";
        assert_ne!(mask(pan), pan);
    }

    struct XorCipher(u8);
    impl PanCipher for XorCipher {
        fn encrypt(&self, pan: &str) -> Vec<u8> {
            pan.bytes().map(|b| b ^ self.0).collect()
        }
        fn decrypt(&self, ciphertext: &[u8]) -> Option<String> {
            String::from_utf8(ciphertext.iter().map(|b| b ^ self.0).collect()).ok()
        }
    }

    #[test]
    fn cipher_roundtrip_and_ciphertext_not_cleartext() {
        let cipher = XorCipher(0x5A);
        let pan = "4111111111111111";
        let ct = cipher.encrypt(pan);
        assert_ne!(ct, pan.as_bytes());
        assert_eq!(cipher.decrypt(&ct).unwrap(), pan);
    }
}
