//! # Obscura Scanner
//!
//! Batch scanning of the announcement log to discover incoming payments.
//!
//! ## Features
//!
//! - **Block-range paging**: Fetches the log in configurable pages
//! - **Progress reporting**: Callbacks for UI progress updates
//! - **Resumable scans**: Tracks position to resume interrupted scans
//! - **Cancellation**: Cooperative cancellation via a shared token
//! - **Parallel matching**: Optional multi-core matching for large logs
//!
//! The scanner needs only the viewing secret and the spending *public*
//! key, so it can run as a watch-only service that is unable to spend.
//!
//! ## Example
//!
//! ```rust,ignore
//! use obscura_scanner::{Scanner, ScannerConfig};
//! use obscura_registry::MemoryRegistry;
//!
//! let scanner = Scanner::from_wallet(&wallet);
//!
//! let matched = scanner.scan_all(&registry).await?;
//! for payment in matched {
//!     println!("Found payment at: {}", payment.stealth_address);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use obscura_core::constants::{DEFAULT_PARALLEL_CHUNK_SIZE, DEFAULT_SCAN_BATCH_SIZE};
use obscura_core::error::{ObscuraError, Result};
use obscura_core::traits::{AnnouncementLog, LogFilter};
use obscura_core::types::{Announcement, CurvePublicKey, SecretScalar};
use obscura_stealth::discovery::{
    scan_announcement, scan_with_stats, MatchedPayment, ScanOutcome, ScanStats,
};
use obscura_stealth::wallet::{StealthWallet, ViewingKeyExport};

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Scanner configuration.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Block-range page size for log fetches
    pub batch_size: u64,
    /// Lowest block to scan from (inclusive, default 0)
    pub from_block: Option<u64>,
    /// Highest block to scan to (inclusive, default: log head)
    pub to_block: Option<u64>,
    /// Restrict scanning to a single scheme id
    pub scheme_id: Option<u32>,
    /// Whether to stop on the first match
    pub stop_on_first: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
            from_block: None,
            to_block: None,
            scheme_id: None,
            stop_on_first: false,
        }
    }
}

impl ScannerConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size (clamped to at least 1).
    pub fn batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Sets the block range to scan.
    pub fn block_range(mut self, from: u64, to: u64) -> Self {
        self.from_block = Some(from);
        self.to_block = Some(to);
        self
    }

    /// Restricts the scan to a single scheme id.
    pub fn scheme(mut self, scheme_id: u32) -> Self {
        self.scheme_id = Some(scheme_id);
        self
    }

    /// Enables stopping on the first match.
    pub fn stop_on_first(mut self) -> Self {
        self.stop_on_first = true;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRESS AND POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Scan progress information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Total announcements expected by this scan, or 0 when the filtered
    /// total is unknown. With a zero total, `percent` stays 0 and
    /// `eta_seconds` stays `None`.
    pub total: u64,
    /// Announcements scanned so far
    pub scanned: u64,
    /// Matches found so far
    pub matches: u64,
    /// Current scan rate (announcements per second)
    pub rate: f64,
    /// Estimated time remaining in seconds
    pub eta_seconds: Option<f64>,
    /// Percentage complete (0-100)
    pub percent: f64,
}

impl ScanProgress {
    /// Creates a new progress tracker.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            scanned: 0,
            matches: 0,
            rate: 0.0,
            eta_seconds: None,
            percent: 0.0,
        }
    }

    /// Updates progress with new values.
    pub fn update(&mut self, scanned: u64, matches: u64, elapsed_ms: u64) {
        self.scanned = scanned;
        self.matches = matches;

        if elapsed_ms > 0 {
            self.rate = (scanned as f64 / elapsed_ms as f64) * 1000.0;
        }

        if self.total > 0 {
            self.percent = (scanned as f64 / self.total as f64) * 100.0;

            if self.rate > 0.0 {
                let remaining = self.total.saturating_sub(scanned);
                self.eta_seconds = Some(remaining as f64 / self.rate);
            }
        }
    }
}

/// Scan position for resumable scanning.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScanPosition {
    /// Last scanned announcement ID
    pub last_id: u64,
    /// Last scanned block number
    pub last_block: u64,
    /// Total announcements scanned in this session
    pub total_scanned: u64,
    /// Total matches in this session
    pub total_matches: u64,
}

impl ScanPosition {
    /// Creates a new scan position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates position after scanning an announcement.
    pub fn update(&mut self, announcement: &Announcement, matched: bool) {
        self.last_id = self.last_id.max(announcement.id);
        if let Some(block) = announcement.block_number {
            self.last_block = self.last_block.max(block);
        }
        self.total_scanned += 1;
        if matched {
            self.total_matches += 1;
        }
    }
}

/// Cooperative cancellation token shared between the scan loop and its
/// controller.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Main scanner for discovering payments in an announcement log.
pub struct Scanner {
    /// Viewing secret key (for ECDH)
    viewing_sk: Arc<SecretScalar>,
    /// Spending public key (for address derivation)
    spending_pk: CurvePublicKey,
    /// Current scan position
    position: RwLock<ScanPosition>,
    /// Scan statistics
    stats: RwLock<ScanStats>,
}

impl Scanner {
    /// Creates a new scanner with the given keys.
    pub fn new(viewing_sk: SecretScalar, spending_pk: CurvePublicKey) -> Self {
        Self {
            viewing_sk: Arc::new(viewing_sk),
            spending_pk,
            position: RwLock::new(ScanPosition::new()),
            stats: RwLock::new(ScanStats::new()),
        }
    }

    /// Creates a scanner from a wallet.
    pub fn from_wallet(wallet: &StealthWallet) -> Self {
        Self::new(
            SecretScalar::from_array(*wallet.keys().viewing.secret.as_array()),
            *wallet.spending_public_key(),
        )
    }

    /// Creates a watch-only scanner from an exported viewing key.
    pub fn from_export(export: &ViewingKeyExport) -> Result<Self> {
        let secret = hex::decode(&export.viewing_secret_key)?;
        Ok(Self::new(
            SecretScalar::from_bytes(&secret)?,
            CurvePublicKey::from_hex(&export.spending_public_key)?,
        ))
    }

    /// Returns the current scan position.
    pub fn position(&self) -> ScanPosition {
        self.position.read().clone()
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> ScanStats {
        self.stats.read().clone()
    }

    /// Resets the scan position and statistics.
    pub fn reset(&self) {
        *self.position.write() = ScanPosition::new();
        *self.stats.write() = ScanStats::new();
    }

    /// Scans a single announcement.
    pub fn scan_one(&self, announcement: &Announcement) -> ScanOutcome {
        let outcome = scan_announcement(announcement, &self.viewing_sk, &self.spending_pk);
        self.stats.write().record(&outcome);
        self.position
            .write()
            .update(announcement, outcome.is_matched());
        outcome
    }

    /// Scans the whole log with default configuration.
    #[instrument(skip(self, log))]
    pub async fn scan_all(&self, log: &dyn AnnouncementLog) -> Result<Vec<MatchedPayment>> {
        self.scan_with_config(log, ScannerConfig::default()).await
    }

    /// Scans with custom configuration.
    #[instrument(skip(self, log, config))]
    pub async fn scan_with_config(
        &self,
        log: &dyn AnnouncementLog,
        config: ScannerConfig,
    ) -> Result<Vec<MatchedPayment>> {
        self.run_scan(log, config, None, None).await
    }

    /// Scans with progress reporting.
    #[instrument(skip(self, log, config, progress_callback))]
    pub async fn scan_with_progress(
        &self,
        log: &dyn AnnouncementLog,
        config: ScannerConfig,
        progress_callback: ProgressCallback,
    ) -> Result<Vec<MatchedPayment>> {
        self.run_scan(log, config, Some(&progress_callback), None)
            .await
    }

    /// Scans until complete or the token is cancelled.
    ///
    /// Cancellation is cooperative: the scan returns the matches found so
    /// far, and [`Scanner::position`] records where it stopped.
    #[instrument(skip(self, log, config, cancel))]
    pub async fn scan_with_cancel(
        &self,
        log: &dyn AnnouncementLog,
        config: ScannerConfig,
        cancel: &CancelToken,
    ) -> Result<Vec<MatchedPayment>> {
        self.run_scan(log, config, None, Some(cancel)).await
    }

    async fn run_scan(
        &self,
        log: &dyn AnnouncementLog,
        config: ScannerConfig,
        progress_callback: Option<&ProgressCallback>,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<MatchedPayment>> {
        let start = Instant::now();
        let mut matched = Vec::new();

        // The log-wide count only describes an unfiltered scan. A block
        // range or scheme filter sees fewer announcements, so the total
        // is unknown there and percent/eta are suppressed.
        let unbounded =
            config.from_block.is_none() && config.to_block.is_none() && config.scheme_id.is_none();
        let total = if unbounded { log.count().await? } else { 0 };
        let mut progress = ScanProgress::new(total);
        let mut scanned = 0u64;

        info!(total, "Starting scan");

        let mut pages = LogPager::new(log, &config);
        'pages: while let Some(page) = pages.next_page().await? {
            debug!(count = page.len(), "Scanning page");

            for announcement in page {
                if cancel.map_or(false, CancelToken::is_cancelled) {
                    info!(scanned, "Scan cancelled");
                    break 'pages;
                }

                let outcome = scan_announcement(&announcement, &self.viewing_sk, &self.spending_pk);
                self.stats.write().record(&outcome);
                self.position
                    .write()
                    .update(&announcement, outcome.is_matched());
                scanned += 1;

                if let ScanOutcome::Matched(payment) = outcome {
                    matched.push(payment);

                    if config.stop_on_first {
                        info!("Stopping on first match");
                        break 'pages;
                    }
                }

                // Report progress every 100 announcements
                if scanned % 100 == 0 {
                    if let Some(callback) = progress_callback {
                        progress.update(
                            scanned,
                            matched.len() as u64,
                            start.elapsed().as_millis() as u64,
                        );
                        callback(progress.clone());
                    }
                }
            }
        }

        if let Some(callback) = progress_callback {
            progress.update(
                scanned,
                matched.len() as u64,
                start.elapsed().as_millis() as u64,
            );
            callback(progress);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let rate = {
            let mut stats = self.stats.write();
            stats.duration_ms = duration_ms;
            stats.rate()
        };

        info!(
            matches = matched.len(),
            scanned,
            duration_ms,
            rate = format!("{:.2}/s", rate),
            "Scan complete"
        );

        Ok(matched)
    }

    /// Scans with parallel matching across blocking worker threads.
    ///
    /// Pages are fetched sequentially, then matched in chunks on the
    /// blocking thread pool. Matches are returned in log order.
    #[instrument(skip(self, log, config))]
    pub async fn scan_parallel(
        &self,
        log: &dyn AnnouncementLog,
        config: ScannerConfig,
    ) -> Result<Vec<MatchedPayment>> {
        let start = Instant::now();

        let mut announcements = Vec::new();
        let mut pages = LogPager::new(log, &config);
        while let Some(page) = pages.next_page().await? {
            announcements.extend(page);
        }

        info!(
            total = announcements.len(),
            chunk_size = DEFAULT_PARALLEL_CHUNK_SIZE,
            "Starting parallel scan"
        );

        let mut handles = Vec::new();
        for chunk in announcements.chunks(DEFAULT_PARALLEL_CHUNK_SIZE) {
            let chunk = chunk.to_vec();
            let viewing_sk = Arc::clone(&self.viewing_sk);
            let spending_pk = self.spending_pk;
            handles.push(tokio::task::spawn_blocking(move || {
                scan_with_stats(&chunk, &viewing_sk, &spending_pk)
            }));
        }

        let mut matched = Vec::new();
        for result in futures::future::join_all(handles).await {
            let (chunk_matched, chunk_stats) =
                result.map_err(|e| ObscuraError::ScanError(format!("worker failed: {e}")))?;
            matched.extend(chunk_matched);

            let mut stats = self.stats.write();
            stats.total_scanned += chunk_stats.total_scanned;
            stats.view_tag_skips += chunk_stats.view_tag_skips;
            stats.false_positives += chunk_stats.false_positives;
            stats.matches += chunk_stats.matches;
            stats.errors += chunk_stats.errors;
        }
        matched.sort_by_key(|payment| payment.announcement.id);

        {
            let mut position = self.position.write();
            for announcement in &announcements {
                position.last_id = position.last_id.max(announcement.id);
                if let Some(block) = announcement.block_number {
                    position.last_block = position.last_block.max(block);
                }
            }
            position.total_scanned += announcements.len() as u64;
            position.total_matches += matched.len() as u64;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        self.stats.write().duration_ms = duration_ms;

        info!(
            matches = matched.len(),
            scanned = announcements.len(),
            duration_ms,
            "Parallel scan complete"
        );

        Ok(matched)
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("spending_pk", &self.spending_pk)
            .field("viewing_sk", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOG PAGING
// ═══════════════════════════════════════════════════════════════════════════════

/// Pages through the log in block-range windows.
struct LogPager<'a> {
    log: &'a dyn AnnouncementLog,
    scheme_id: Option<u32>,
    batch_size: u64,
    next_block: u64,
    to_block: Option<u64>,
    resolved: bool,
    done: bool,
}

impl<'a> LogPager<'a> {
    fn new(log: &'a dyn AnnouncementLog, config: &ScannerConfig) -> Self {
        Self {
            log,
            scheme_id: config.scheme_id,
            batch_size: config.batch_size.max(1),
            next_block: config.from_block.unwrap_or(0),
            to_block: config.to_block,
            resolved: config.to_block.is_some(),
            done: false,
        }
    }

    async fn next_page(&mut self) -> Result<Option<Vec<Announcement>>> {
        if self.done {
            return Ok(None);
        }

        if !self.resolved {
            self.to_block = self.log.latest_block().await?;
            self.resolved = true;

            // Nothing mined yet: one unbounded fetch covers the whole log,
            // including announcements without a block number.
            if self.to_block.is_none() {
                self.done = true;
                let filter = LogFilter {
                    scheme_id: self.scheme_id,
                    ..Default::default()
                };
                let page = self.log.get_logs(&filter).await?;
                return Ok(if page.is_empty() { None } else { Some(page) });
            }
        }

        let to = match self.to_block {
            Some(to) if self.next_block <= to => to,
            _ => {
                self.done = true;
                return Ok(None);
            }
        };

        let window_end = self.next_block.saturating_add(self.batch_size - 1).min(to);
        let mut filter = LogFilter::block_range(self.next_block, window_end);
        filter.scheme_id = self.scheme_id;
        let page = self.log.get_logs(&filter).await?;

        match window_end.checked_add(1) {
            Some(next) => self.next_block = next,
            None => self.done = true,
        }

        Ok(Some(page))
    }
}

/// Scan result summary for reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Number of announcements scanned
    pub total_scanned: u64,
    /// Announcements skipped by the view tag pre-filter
    pub view_tag_skips: u64,
    /// View tag matches that failed the full address check
    pub false_positives: u64,
    /// Number of payments matched
    pub matches: u64,
    /// Number of errors
    pub errors: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Scan rate (announcements per second)
    pub rate: f64,
    /// Filter efficiency (% skipped by view tag)
    pub filter_efficiency: f64,
}

impl From<ScanStats> for ScanSummary {
    fn from(stats: ScanStats) -> Self {
        Self {
            total_scanned: stats.total_scanned,
            view_tag_skips: stats.view_tag_skips,
            false_positives: stats.false_positives,
            matches: stats.matches,
            errors: stats.errors,
            duration_ms: stats.duration_ms,
            rate: stats.rate(),
            filter_efficiency: stats.filter_efficiency(),
        }
    }
}
