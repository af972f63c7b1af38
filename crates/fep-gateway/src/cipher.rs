//! Stand-in `PanCipher` for deployments with no HSM/KMS wired up yet
//! (§1 "HSM-backed PAN encryption is an external collaborator"). Real
//! deployments should supply their own `PanCipher` backed by their vault;
//! this one exists so `fep-gateway` runs standalone.

use fep_core::pan::PanCipher;

pub struct XorPanCipher {
    key: Vec<u8>,
}

impl XorPanCipher {
    pub fn from_env() -> Self {
        let key = std::env::var("FEP_PAN_KEY").unwrap_or_else(|_| "fep-gateway-default-key".to_string());
        XorPanCipher { key: key.into_bytes() }
    }

    fn xor(&self, bytes: &[u8]) -> Vec<u8> {
        bytes.iter().enumerate().map(|(i, b)| b ^ self.key[i % self.key.len()]).collect()
    }
}

impl PanCipher for XorPanCipher {
    fn encrypt(&self, pan: &str) -> Vec<u8> {
        self.xor(pan.as_bytes())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Option<String> {
        String::from_utf8(self.xor(ciphertext)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips() {
        let cipher = XorPanCipher { key: b"k".to_vec() };
        let pan = "4111111111111111";
        let ct = cipher.encrypt(pan);
        assert_ne!(ct, pan.as_bytes());
        assert_eq!(cipher.decrypt(&ct).unwrap(), pan);
    }
}
