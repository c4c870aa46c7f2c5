//! 授权校验与主机指纹
//!
//! 授权串为 base64( AES-128-CBC( `公司/地点/服务器指纹/机台上限` ) )。
//! 密钥与 IV 来自环境变量，至多 16 字节，不足部分补零。校验要求
//! 授权中的服务器指纹等于本机指纹的 SHA-256，且启用机台数不超过
//! 授权上限。

use aes::cipher::{block_padding::Pkcs7, BlockModeDecrypt, BlockModeEncrypt, KeyIvInit};
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// 授权校验错误。
#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("decrypt failed")]
    Decrypt,
    #[error("malformed license payload")]
    Malformed,
    #[error("license not issued for this server")]
    ServerMismatch,
    #[error("enabled machines {actual} exceed licensed total {licensed}")]
    CapacityExceeded { actual: usize, licensed: u32 },
}

/// 解密后的授权信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseInfo {
    pub company: String,
    pub location: String,
    pub server_uniq_id: String,
    pub total_license: u32,
}

/// 将 ≤16 字节的密钥材料补零到 16 字节；超长部分截断。
fn pad_key_material(material: &str) -> [u8; 16] {
    let mut key = [0u8; 16];
    let bytes = material.as_bytes();
    let len = bytes.len().min(16);
    key[..len].copy_from_slice(&bytes[..len]);
    key
}

/// 解密授权串。
pub fn decrypt_license(blob: &str, secret: &str, iv: &str) -> Result<LicenseInfo, LicenseError> {
    let ciphertext = general_purpose::STANDARD
        .decode(blob.trim())
        .map_err(|error| LicenseError::Base64(error.to_string()))?;
    let key = pad_key_material(secret);
    let iv = pad_key_material(iv);
    let plaintext = Aes128CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec::<Pkcs7>(&ciphertext)
        .map_err(|_| LicenseError::Decrypt)?;
    let text = String::from_utf8(plaintext).map_err(|_| LicenseError::Decrypt)?;
    parse_license(&text)
}

/// 加密授权信息（签发与回归校验用，解密的逆操作）。
pub fn encrypt_license(info: &LicenseInfo, secret: &str, iv: &str) -> String {
    let plain = format!(
        "{}/{}/{}/{}",
        info.company, info.location, info.server_uniq_id, info.total_license
    );
    let key = pad_key_material(secret);
    let iv = pad_key_material(iv);
    let ciphertext =
        Aes128CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec::<Pkcs7>(plain.as_bytes());
    general_purpose::STANDARD.encode(ciphertext)
}

fn parse_license(text: &str) -> Result<LicenseInfo, LicenseError> {
    let parts: Vec<&str> = text.split('/').collect();
    if parts.len() != 4 {
        return Err(LicenseError::Malformed);
    }
    let total_license = parts[3].trim().parse::<u32>().map_err(|_| LicenseError::Malformed)?;
    Ok(LicenseInfo {
        company: parts[0].to_string(),
        location: parts[1].to_string(),
        server_uniq_id: parts[2].to_string(),
        total_license,
    })
}

/// SHA-256 的小写十六进制形式。
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// 主机指纹
///
/// 优先读容器挂载的宿主 machine-id，其次系统 machine-id，最后由
/// 主机名、平台、架构与首个 CPU 型号合成。结果恒为小写十六进制
/// SHA-256。
pub fn machine_fingerprint() -> String {
    for path in ["/host-machine-id", "/etc/machine-id"] {
        if let Ok(content) = std::fs::read_to_string(path) {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return sha256_hex(trimmed.as_bytes());
            }
        }
    }

    let mut system = sysinfo::System::new();
    system.refresh_cpu_all();
    let hostname = sysinfo::System::host_name().unwrap_or_default();
    let cpu_model = system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().to_string())
        .unwrap_or_default();
    let composed = format!(
        "{}|{}|{}|{}",
        hostname,
        std::env::consts::OS,
        std::env::consts::ARCH,
        cpu_model
    );
    sha256_hex(composed.as_bytes())
}

/// 授权校验器
///
/// 指纹在构造时确定；每个采集周期以最新配置中的授权串调用
/// `validate`。
pub struct LicenseValidator {
    secret: String,
    iv: String,
    fingerprint: String,
}

impl LicenseValidator {
    pub fn new(secret: impl Into<String>, iv: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            iv: iv.into(),
            fingerprint: machine_fingerprint(),
        }
    }

    /// 指定指纹构造（测试用）。
    pub fn with_fingerprint(
        secret: impl Into<String>,
        iv: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            secret: secret.into(),
            iv: iv.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// 校验授权串与启用机台数量。
    pub fn validate(
        &self,
        blob: &str,
        enabled_machines: usize,
    ) -> Result<LicenseInfo, LicenseError> {
        let info = decrypt_license(blob, &self.secret, &self.iv)?;
        if info.server_uniq_id != sha256_hex(self.fingerprint.as_bytes()) {
            return Err(LicenseError::ServerMismatch);
        }
        if enabled_machines as u32 > info.total_license {
            return Err(LicenseError::CapacityExceeded {
                actual: enabled_machines,
                licensed: info.total_license,
            });
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";
    const IV: &str = "unit-test-iv";

    fn sample_info(server_uniq_id: &str, total_license: u32) -> LicenseInfo {
        LicenseInfo {
            company: "PT Kabel Nusantara".to_string(),
            location: "Bekasi".to_string(),
            server_uniq_id: server_uniq_id.to_string(),
            total_license,
        }
    }

    #[test]
    fn encrypt_decrypt_round_trips_with_zero_padded_keys() {
        let info = sample_info("abc123", 12);
        let blob = encrypt_license(&info, "short", "iv");
        let decrypted = decrypt_license(&blob, "short", "iv").expect("decrypt");
        assert_eq!(decrypted, info);
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let blob = encrypt_license(&sample_info("abc123", 12), SECRET, IV);
        let result = decrypt_license(&blob, "other-secret", IV);
        assert!(matches!(
            result,
            Err(LicenseError::Decrypt) | Err(LicenseError::Malformed)
        ));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let blob = {
            let plain = "only/three/parts";
            let key = pad_key_material(SECRET);
            let iv = pad_key_material(IV);
            let ciphertext = Aes128CbcEnc::new(&key.into(), &iv.into())
                .encrypt_padded_vec::<Pkcs7>(plain.as_bytes());
            general_purpose::STANDARD.encode(ciphertext)
        };
        assert!(matches!(
            decrypt_license(&blob, SECRET, IV),
            Err(LicenseError::Malformed)
        ));
    }

    #[test]
    fn validator_checks_fingerprint_and_capacity() {
        let fingerprint = "deadbeef";
        let info = sample_info(&sha256_hex(fingerprint.as_bytes()), 3);
        let blob = encrypt_license(&info, SECRET, IV);
        let validator = LicenseValidator::with_fingerprint(SECRET, IV, fingerprint);

        assert!(validator.validate(&blob, 3).is_ok());
        assert!(matches!(
            validator.validate(&blob, 4),
            Err(LicenseError::CapacityExceeded { actual: 4, licensed: 3 })
        ));

        let other = LicenseValidator::with_fingerprint(SECRET, IV, "someone-else");
        assert!(matches!(
            other.validate(&blob, 1),
            Err(LicenseError::ServerMismatch)
        ));
    }

    #[test]
    fn fingerprint_is_lowercase_hex_sha256() {
        let fingerprint = machine_fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
