// Copyright (c) 2026 RoundProof Contributors
// SPDX-License-Identifier: Apache-2.0

//! Content-addressed publication of round artifacts.
//!
//! `upload` only fails on validation (missing file, above the hard cap). Every network outcome
//! ends in a record: a real CID, or a deterministic simulated CID derived from the file digest.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::digest::{sha256_file, Hash32};
use crate::error::{RoundError, RoundResult};
use crate::pinning::{PinError, PinningCredentials, PinningService};

const MIB: u64 = 1024 * 1024;

pub const SIMULATED_CID_PREFIX: &str = "bafybeib";
pub const SIMULATED_CID_DIGEST_CHARS: usize = 46;
pub const COMPRESSION_LEVEL: i32 = 3;
pub const COMPRESSED_SUFFIX: &str = ".zst";

/// Deterministic stand-in CID: fixed prefix plus the leading hex of the content digest.
pub fn simulated_cid(digest: &Hash32) -> String {
    let hex = hex::encode(digest);
    format!("{SIMULATED_CID_PREFIX}{}", &hex[..SIMULATED_CID_DIGEST_CHARS])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub hard_cap_bytes: u64,
    pub simulate_above_bytes: u64,
    pub compress_above_bytes: u64,
    pub max_retries: u32,
    /// Minimum spacing between any two pin requests issued by one uploader.
    pub rate_limit_delay: Duration,
    /// One "second" of the backoff schedule; shrunk in tests.
    pub backoff_unit: Duration,
    pub verify_attempts: u32,
    pub verify_uploads: bool,
    pub min_upload_timeout: Duration,
    /// Bytes granted one `min_upload_timeout` each when sizing the per-upload timeout.
    pub timeout_chunk_bytes: u64,
    /// Where compressed temporaries are created; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            hard_cap_bytes: 500 * MIB,
            simulate_above_bytes: 200 * MIB,
            compress_above_bytes: 50 * MIB,
            max_retries: 3,
            rate_limit_delay: Duration::from_secs(1),
            backoff_unit: Duration::from_secs(1),
            verify_attempts: 3,
            verify_uploads: true,
            min_upload_timeout: Duration::from_secs(60),
            timeout_chunk_bytes: 50 * MIB,
            scratch_dir: None,
        }
    }
}

impl UploadPolicy {
    pub fn upload_timeout(&self, size_bytes: u64) -> Duration {
        let chunk = self.timeout_chunk_bytes.max(1);
        let scaled = self
            .min_upload_timeout
            .mul_f64(size_bytes as f64 / chunk as f64);
        scaled.max(self.min_upload_timeout)
    }

    /// Delay slept after a failed attempt (0-based) before the next one.
    pub fn backoff_after(&self, attempt: u32, error: &PinError) -> Duration {
        match error {
            PinError::RateLimited(_) | PinError::Timeout => {
                self.backoff_unit.saturating_mul(5 * (attempt + 1))
            }
            _ => self
                .backoff_unit
                .saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

/// Spaces requests from every task sharing one uploader. The next free slot is reserved under
/// the lock; the wait happens outside it.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.delay);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub source_path: PathBuf,
    pub size_bytes: u64,
    pub cid: String,
    pub simulated: bool,
    pub verified_accessible: bool,
    pub attempts: u32,
    #[serde(default)]
    pub compressed: bool,
    /// Backoff actually slept between attempts, in order.
    #[serde(default)]
    pub backoff_ms: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub credentials_rejected: bool,
}

pub struct ContentAddressedUploader {
    service: Arc<dyn PinningService>,
    policy: UploadPolicy,
    limiter: RateLimiter,
}

impl ContentAddressedUploader {
    pub fn new(service: Arc<dyn PinningService>, policy: UploadPolicy) -> Self {
        let limiter = RateLimiter::new(policy.rate_limit_delay);
        Self {
            service,
            policy,
            limiter,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub async fn test_credentials(&self, credentials: &PinningCredentials) -> bool {
        match self.service.test_credentials(credentials).await {
            Ok(valid) => {
                tracing::info!(target: "roundproof.upload", valid, "pinning credential test");
                valid
            }
            Err(err) => {
                tracing::warn!(target: "roundproof.upload", error = %err, "pinning credential test failed");
                false
            }
        }
    }

    pub async fn upload(
        &self,
        path: &Path,
        credentials: &PinningCredentials,
    ) -> RoundResult<UploadRecord> {
        let size_bytes = self.validate(path).await?;
        let mut record = UploadRecord {
            source_path: path.to_path_buf(),
            size_bytes,
            cid: String::new(),
            simulated: false,
            verified_accessible: false,
            attempts: 0,
            compressed: false,
            backoff_ms: Vec::new(),
            last_error: None,
            credentials_rejected: false,
        };

        if size_bytes > self.policy.simulate_above_bytes {
            tracing::warn!(
                target: "roundproof.upload",
                path = %path.display(),
                size_bytes,
                "artifact above network threshold; using simulated CID"
            );
            return self.simulate(record).await;
        }

        // Held until this function returns so the temporary is removed on every path.
        let compressed = if size_bytes > self.policy.compress_above_bytes {
            self.compress(path).await
        } else {
            None
        };
        let (upload_path, file_name) = match &compressed {
            Some(tmp) => {
                record.compressed = true;
                (tmp.path().to_path_buf(), format!("{}{COMPRESSED_SUFFIX}", file_name_of(path)))
            }
            None => (path.to_path_buf(), file_name_of(path)),
        };
        let sent_bytes = match &compressed {
            Some(tmp) => tokio::fs::metadata(tmp.path())
                .await
                .map(|meta| meta.len())
                .unwrap_or(size_bytes),
            None => size_bytes,
        };
        let timeout = self.policy.upload_timeout(sent_bytes);

        let mut cid = None;
        for attempt in 0..self.policy.max_retries {
            self.limiter.acquire().await;
            record.attempts += 1;
            tracing::info!(
                target: "roundproof.upload",
                path = %upload_path.display(),
                attempt = attempt + 1,
                max = self.policy.max_retries,
                "pin attempt"
            );
            match self
                .service
                .pin_file(&upload_path, &file_name, credentials, timeout)
                .await
            {
                Ok(value) => {
                    cid = Some(value);
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        target: "roundproof.upload",
                        attempt = attempt + 1,
                        error = %err,
                        "pin attempt failed"
                    );
                    record.last_error = Some(err.to_string());
                    if !err.is_retryable() {
                        record.credentials_rejected = true;
                        let rejected = RoundError::UploadRejected(err.to_string());
                        tracing::error!(target: "roundproof.upload", error = %rejected, "aborting retries");
                        break;
                    }
                    if attempt + 1 < self.policy.max_retries {
                        let delay = self.policy.backoff_after(attempt, &err);
                        record.backoff_ms.push(delay.as_millis() as u64);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        drop(compressed);

        match cid {
            Some(cid) => {
                record.verified_accessible =
                    self.policy.verify_uploads && self.verify_accessible(&cid).await;
                tracing::info!(
                    target: "roundproof.upload",
                    path = %path.display(),
                    %cid,
                    attempts = record.attempts,
                    verified = record.verified_accessible,
                    "artifact pinned"
                );
                record.cid = cid;
                Ok(record)
            }
            None => {
                tracing::warn!(
                    target: "roundproof.upload",
                    path = %path.display(),
                    attempts = record.attempts,
                    "network upload exhausted; using simulated CID"
                );
                self.simulate(record).await
            }
        }
    }

    /// Uploads independent artifacts concurrently. The shared rate limiter still spaces the
    /// individual requests.
    pub async fn upload_all(
        self: &Arc<Self>,
        artifacts: Vec<(String, PathBuf)>,
        credentials: &PinningCredentials,
    ) -> RoundResult<BTreeMap<String, UploadRecord>> {
        let mut tasks = JoinSet::new();
        for (name, path) in artifacts {
            let uploader = Arc::clone(self);
            let credentials = credentials.clone();
            tasks.spawn(async move {
                let record = uploader.upload(&path, &credentials).await;
                (name, record)
            });
        }

        let mut records = BTreeMap::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined
                .map_err(|err| RoundError::Io(std::io::Error::other(err.to_string())))?;
            match result {
                Ok(record) => {
                    records.insert(name, record);
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }

    async fn validate(&self, path: &Path) -> RoundResult<u64> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(RoundError::InvalidInput(format!(
                    "upload source not found: {}",
                    path.display()
                )))
            }
            Err(err) => return Err(err.into()),
        };
        if !meta.is_file() {
            return Err(RoundError::InvalidInput(format!(
                "upload source is not a regular file: {}",
                path.display()
            )));
        }
        if meta.len() > self.policy.hard_cap_bytes {
            return Err(RoundError::InvalidInput(format!(
                "{} is {} bytes, above the {} byte cap",
                path.display(),
                meta.len(),
                self.policy.hard_cap_bytes
            )));
        }
        Ok(meta.len())
    }

    async fn compress(&self, path: &Path) -> Option<NamedTempFile> {
        let source = path.to_path_buf();
        let scratch = self.policy.scratch_dir.clone();
        let result = tokio::task::spawn_blocking(move || compress_to_temp(&source, scratch.as_deref()))
            .await
            .map_err(|err| std::io::Error::other(err.to_string()))
            .and_then(|inner| inner);
        match result {
            Ok(tmp) => Some(tmp),
            Err(err) => {
                tracing::warn!(
                    target: "roundproof.upload",
                    path = %path.display(),
                    error = %err,
                    "compression failed; uploading original"
                );
                None
            }
        }
    }

    async fn simulate(&self, mut record: UploadRecord) -> RoundResult<UploadRecord> {
        let path = record.source_path.clone();
        let digest = tokio::task::spawn_blocking(move || sha256_file(&path))
            .await
            .map_err(|err| RoundError::Io(std::io::Error::other(err.to_string())))??;
        record.cid = simulated_cid(&digest);
        record.simulated = true;
        record.verified_accessible = false;
        Ok(record)
    }

    async fn verify_accessible(&self, cid: &str) -> bool {
        let attempts = self.policy.verify_attempts.max(1);
        let mut last = String::from("no attempt made");
        for attempt in 0..attempts {
            match self.service.fetch_from_gateway(cid).await {
                Ok(true) => return true,
                Ok(false) => last = "gateway returned a non-success status".to_string(),
                Err(err) => last = err.to_string(),
            }
            if attempt + 1 < attempts {
                let delay = self
                    .policy
                    .backoff_unit
                    .saturating_mul(2u32.saturating_pow(attempt));
                tokio::time::sleep(delay).await;
            }
        }
        let err = RoundError::VerificationInconclusive(format!("{cid}: {last}"));
        tracing::warn!(target: "roundproof.upload", error = %err, "artifact pinned but not yet reachable");
        false
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string())
}

fn compress_to_temp(path: &Path, scratch: Option<&Path>) -> std::io::Result<NamedTempFile> {
    let mut source = BufReader::new(File::open(path)?);
    let mut builder = tempfile::Builder::new();
    builder.prefix("roundproof-").suffix(COMPRESSED_SUFFIX);
    let mut tmp = match scratch {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    zstd::stream::copy_encode(&mut source, tmp.as_file_mut(), COMPRESSION_LEVEL)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::sha256;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    /// Replays scripted pin outcomes; once the script runs dry every call fails transiently.
    #[derive(Default)]
    struct ScriptedService {
        pins: Mutex<VecDeque<Result<String, PinError>>>,
        gateway: Mutex<VecDeque<bool>>,
        pinned_names: Mutex<Vec<String>>,
        pinned_sizes: Mutex<Vec<u64>>,
        timeouts: Mutex<Vec<Duration>>,
    }

    impl ScriptedService {
        fn with_pins(pins: Vec<Result<String, PinError>>) -> Self {
            Self {
                pins: Mutex::new(pins.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl PinningService for ScriptedService {
        async fn pin_file(
            &self,
            path: &Path,
            file_name: &str,
            _credentials: &PinningCredentials,
            timeout: Duration,
        ) -> Result<String, PinError> {
            self.timeouts.lock().push(timeout);
            self.pinned_names.lock().push(file_name.to_string());
            self.pinned_sizes
                .lock()
                .push(std::fs::metadata(path).map(|m| m.len()).unwrap_or(0));
            self.pins
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(PinError::Transient("script exhausted".into())))
        }

        async fn test_credentials(&self, _c: &PinningCredentials) -> Result<bool, PinError> {
            Ok(true)
        }

        async fn fetch_from_gateway(&self, _cid: &str) -> Result<bool, PinError> {
            Ok(self.gateway.lock().pop_front().unwrap_or(false))
        }
    }

    fn fast_policy() -> UploadPolicy {
        UploadPolicy {
            rate_limit_delay: Duration::from_millis(1),
            backoff_unit: Duration::from_millis(1),
            ..UploadPolicy::default()
        }
    }

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn creds() -> PinningCredentials {
        PinningCredentials::new("k", "s")
    }

    #[tokio::test]
    async fn first_success_is_verified_through_gateway() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "model_diff.pt", &[1u8; 10 * 1024]);
        let service = Arc::new(ScriptedService::with_pins(vec![Ok("bafy1".into())]));
        service.gateway.lock().extend([false, true]);
        let uploader = ContentAddressedUploader::new(service.clone(), fast_policy());
        let record = uploader.upload(&path, &creds()).await.unwrap();
        assert_eq!(record.cid, "bafy1");
        assert!(!record.simulated);
        assert!(record.verified_accessible);
        assert_eq!(record.attempts, 1);
        assert!(service.gateway.lock().is_empty());
    }

    #[tokio::test]
    async fn generic_failures_exhaust_retries_then_simulate() {
        let dir = TempDir::new().unwrap();
        let bytes = b"update".to_vec();
        let path = write(&dir, "model_diff.pt", &bytes);
        let uploader =
            ContentAddressedUploader::new(Arc::new(ScriptedService::default()), fast_policy());
        let record = uploader.upload(&path, &creds()).await.unwrap();
        assert!(record.simulated);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.cid, simulated_cid(&sha256(&bytes)));
        assert_eq!(record.backoff_ms, vec![1, 2]);
        assert!(!record.credentials_rejected);
        assert!(record.last_error.is_some());
    }

    #[tokio::test]
    async fn rate_limited_responses_back_off_linearly() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.bin", b"a");
        let service = Arc::new(ScriptedService::with_pins(vec![
            Err(PinError::RateLimited("RATE_LIMIT".into())),
            Err(PinError::RateLimited("RATE_LIMIT".into())),
            Err(PinError::RateLimited("RATE_LIMIT".into())),
        ]));
        let uploader = ContentAddressedUploader::new(service, fast_policy());
        let record = uploader.upload(&path, &creds()).await.unwrap();
        assert_eq!(record.attempts, 3);
        assert!(record.simulated);
        assert_eq!(record.backoff_ms, vec![5, 10]);
        assert!(record.backoff_ms.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn invalid_credentials_abort_immediately() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.bin", b"a");
        let service = Arc::new(ScriptedService::with_pins(vec![Err(
            PinError::InvalidCredentials("INVALID_CREDENTIALS".into()),
        )]));
        let uploader = ContentAddressedUploader::new(service, fast_policy());
        let record = uploader.upload(&path, &creds()).await.unwrap();
        assert_eq!(record.attempts, 1);
        assert!(record.credentials_rejected);
        assert!(record.simulated);
        assert!(record.backoff_ms.is_empty());
    }

    #[tokio::test]
    async fn oversized_artifacts_skip_the_network() {
        let dir = TempDir::new().unwrap();
        let bytes = vec![9u8; 4096];
        let path = write(&dir, "big.bin", &bytes);
        let service = Arc::new(ScriptedService::with_pins(vec![Ok("never".into())]));
        let policy = UploadPolicy {
            simulate_above_bytes: 1024,
            hard_cap_bytes: 8192,
            ..fast_policy()
        };
        let uploader = ContentAddressedUploader::new(service.clone(), policy);
        let record = uploader.upload(&path, &creds()).await.unwrap();
        assert!(record.simulated);
        assert_eq!(record.attempts, 0);
        assert_eq!(record.cid.len(), SIMULATED_CID_PREFIX.len() + SIMULATED_CID_DIGEST_CHARS);
        assert_eq!(record.cid, simulated_cid(&sha256(&bytes)));
        assert!(service.pinned_names.lock().is_empty());
    }

    #[tokio::test]
    async fn validation_rejects_missing_and_capped_files() {
        let dir = TempDir::new().unwrap();
        let uploader =
            ContentAddressedUploader::new(Arc::new(ScriptedService::default()), UploadPolicy {
                hard_cap_bytes: 4,
                ..fast_policy()
            });
        let missing = uploader
            .upload(&dir.path().join("absent"), &creds())
            .await
            .unwrap_err();
        assert!(matches!(missing, RoundError::InvalidInput(_)));

        let path = write(&dir, "five.bin", b"12345");
        let capped = uploader.upload(&path, &creds()).await.unwrap_err();
        assert!(matches!(capped, RoundError::InvalidInput(_)));

        let not_a_file = uploader.upload(dir.path(), &creds()).await.unwrap_err();
        assert!(matches!(not_a_file, RoundError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn compressed_temporary_is_removed_after_upload() {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let path = write(&dir, "model_diff.pt", &vec![0u8; 64 * 1024]);
        let service = Arc::new(ScriptedService::with_pins(vec![Ok("bafyz".into())]));
        let policy = UploadPolicy {
            compress_above_bytes: 1024,
            verify_uploads: false,
            scratch_dir: Some(scratch.path().to_path_buf()),
            ..fast_policy()
        };
        let uploader = ContentAddressedUploader::new(service.clone(), policy);
        let record = uploader.upload(&path, &creds()).await.unwrap();
        assert!(record.compressed);
        assert_eq!(record.cid, "bafyz");
        assert!(!record.verified_accessible);
        assert_eq!(service.pinned_names.lock()[0], "model_diff.pt.zst");
        assert!(service.pinned_sizes.lock()[0] < 64 * 1024);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn upload_timeout_follows_the_bytes_actually_sent() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "model_diff.pt", &vec![0u8; 64 * 1024]);
        let policy = UploadPolicy {
            compress_above_bytes: 1024,
            verify_uploads: false,
            min_upload_timeout: Duration::from_secs(1),
            timeout_chunk_bytes: 1024,
            ..fast_policy()
        };

        let service = Arc::new(ScriptedService::with_pins(vec![Ok("bafyc".into())]));
        let uploader = ContentAddressedUploader::new(service.clone(), policy.clone());
        assert!(uploader.upload(&path, &creds()).await.unwrap().compressed);
        let sent = service.pinned_sizes.lock()[0];
        assert!(sent < 1024);
        assert_eq!(service.timeouts.lock()[0], policy.upload_timeout(sent));
        assert_eq!(service.timeouts.lock()[0], Duration::from_secs(1));

        let raw = Arc::new(ScriptedService::with_pins(vec![Ok("bafyr".into())]));
        let uncompressed = UploadPolicy {
            compress_above_bytes: u64::MAX,
            ..policy
        };
        ContentAddressedUploader::new(raw.clone(), uncompressed)
            .upload(&path, &creds())
            .await
            .unwrap();
        assert_eq!(raw.timeouts.lock()[0], Duration::from_secs(64));
    }

    #[tokio::test]
    async fn unusable_scratch_dir_uploads_the_original() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "model_diff.pt", &vec![0u8; 4096]);
        let service = Arc::new(ScriptedService::with_pins(vec![Ok("bafyo".into())]));
        let policy = UploadPolicy {
            compress_above_bytes: 1024,
            verify_uploads: false,
            scratch_dir: Some(dir.path().join("missing-scratch")),
            ..fast_policy()
        };
        let uploader = ContentAddressedUploader::new(service.clone(), policy);
        let record = uploader.upload(&path, &creds()).await.unwrap();
        assert!(!record.compressed);
        assert_eq!(service.pinned_names.lock()[0], "model_diff.pt");
        assert_eq!(service.pinned_sizes.lock()[0], 4096);
    }

    #[tokio::test]
    async fn concurrent_uploads_share_one_limiter() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.bin", b"a");
        let b = write(&dir, "b.bin", b"b");
        let service = Arc::new(ScriptedService::with_pins(vec![
            Ok("cid-1".into()),
            Ok("cid-2".into()),
        ]));
        let policy = UploadPolicy {
            rate_limit_delay: Duration::from_millis(50),
            verify_uploads: false,
            ..fast_policy()
        };
        let uploader = Arc::new(ContentAddressedUploader::new(service, policy));
        let started = std::time::Instant::now();
        let records = uploader
            .upload_all(vec![("a".into(), a), ("b".into(), b)], &creds())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(records.len(), 2);
        let mut cids: Vec<_> = records.values().map(|r| r.cid.clone()).collect();
        cids.sort();
        assert_eq!(cids, vec!["cid-1".to_string(), "cid-2".to_string()]);
    }

    #[test]
    fn upload_timeout_scales_with_size() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.upload_timeout(10), Duration::from_secs(60));
        assert_eq!(policy.upload_timeout(150 * MIB), Duration::from_secs(180));
    }

    proptest! {
        #[test]
        fn simulated_cid_is_a_function_of_content(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let a = simulated_cid(&sha256(&bytes));
            let b = simulated_cid(&sha256(&bytes.clone()));
            prop_assert_eq!(&a, &b);
            prop_assert!(a.starts_with(SIMULATED_CID_PREFIX));
            prop_assert_eq!(a.len(), SIMULATED_CID_PREFIX.len() + SIMULATED_CID_DIGEST_CHARS);
        }
    }
}
