use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use warden_config::{Config, OverrideSettings};

use crate::audit;

pub const OVERRIDE_ENV: &str = "HOOK_OVERRIDE_CODE";

type HmacSha1 = Hmac<Sha1>;

/// Validates a human operator's time-based one-time password and downgrades a
/// single blocking decision per process. A missing, malformed, or wrong code
/// all behave identically, so the mechanism offers no oracle.
pub struct OverrideAuthenticator {
    secret: Option<Vec<u8>>,
    settings: OverrideSettings,
    log_dir: PathBuf,
    consumed: AtomicBool,
}

impl OverrideAuthenticator {
    pub fn from_config(cfg: &Config) -> Self {
        let secret = std::fs::read_to_string(cfg.override_secret_path())
            .ok()
            .and_then(|raw| decode_secret(&raw));
        Self {
            secret,
            settings: cfg.override_auth.clone(),
            log_dir: cfg.log_dir(),
            consumed: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn for_tests(secret: Vec<u8>, settings: OverrideSettings, log_dir: PathBuf) -> Self {
        Self {
            secret: Some(secret),
            settings,
            log_dir,
            consumed: AtomicBool::new(false),
        }
    }

    pub fn log_dir(&self) -> &std::path::Path {
        &self.log_dir
    }

    /// Attempt to spend the override on the named guard. Returns true exactly
    /// once per process, and only when `HOOK_OVERRIDE_CODE` holds a currently
    /// valid code. Acceptance is audited best-effort.
    pub fn try_consume(&self, guard_name: &str) -> bool {
        if self.consumed.load(Ordering::SeqCst) {
            return false;
        }
        let Ok(candidate) = std::env::var(OVERRIDE_ENV) else {
            return false;
        };
        if !self.validate(candidate.trim(), now_unix()) {
            return false;
        }
        self.consumed.store(true, Ordering::SeqCst);
        audit::append(
            &self.log_dir,
            "override_audit.log",
            &format!("override accepted for guard '{guard_name}'"),
        );
        true
    }

    fn validate(&self, candidate: &str, now: u64) -> bool {
        let Some(secret) = &self.secret else {
            return false;
        };
        if candidate.len() != self.settings.digits as usize
            || !candidate.bytes().all(|b| b.is_ascii_digit())
        {
            return false;
        }
        let step = self.settings.step_secs.max(1);
        let current = now / step;
        let skew = self.settings.skew_steps;
        let first = current.saturating_sub(skew);
        (first..=current + skew)
            .any(|counter| hotp(secret, counter, self.settings.digits) == candidate)
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn decode_secret(raw: &str) -> Option<Vec<u8>> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    data_encoding::BASE32_NOPAD
        .decode(cleaned.trim_end_matches('=').as_bytes())
        .ok()
}

/// RFC 4226 HOTP truncation over HMAC-SHA1, the compatibility baseline for
/// authenticator apps.
fn hotp(secret: &[u8], counter: u64, digits: u32) -> String {
    let Ok(mut mac) = HmacSha1::new_from_slice(secret) else {
        return String::new();
    };
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);
    let code = binary % 10u32.pow(digits);
    format!("{code:0width$}", width = digits as usize)
}
