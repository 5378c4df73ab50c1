// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Stress validation binary for bundles.
//!
//! Runs concurrent writers and readers against a single bundle, then checks
//! that every read was linearizable and that the chain is well formed.
//!
//! Usage:
//!   ./validate_bundle                          # Human-readable output
//!   ./validate_bundle --json                   # JSON output
//!   ./validate_bundle --writers 4 --readers 8 --updates 100000

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_epoch as epoch;
use strontium_bundle::bundle::{Bundle, BundleConfig};
use strontium_bundle::time::{LogicalOracle, Timestamp, TimestampOracle};

struct Options {
    json: bool,
    writers: usize,
    readers: usize,
    updates: u64,
}

impl Options {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let value_of = |flag: &str, default: u64| -> u64 {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };

        Self {
            json: args.iter().any(|a| a == "--json"),
            writers: value_of("--writers", 4).max(1) as usize,
            readers: value_of("--readers", 4) as usize,
            updates: value_of("--updates", 100_000).max(1),
        }
    }
}

struct Report {
    writers: usize,
    readers: usize,
    updates: u64,
    write_elapsed: Duration,
    reads: u64,
    read_violations: u64,
    chain_len: usize,
    chain_error: Option<String>,
    lookup_violations: u64,
    read_p50_ns: f64,
    read_p99_ns: f64,
    gc_retired: u64,
    gc_error: Option<String>,
}

fn main() {
    let options = Options::from_args();
    let report = run(&options);

    if options.json {
        print_json(&report);
    } else {
        print_human(&report);
    }

    if report.read_violations > 0
        || report.lookup_violations > 0
        || report.chain_error.is_some()
        || report.gc_error.is_some()
    {
        std::process::exit(1);
    }
}

fn run(options: &Options) -> Report {
    // Payloads encode (writer, sequence) so lookups can be matched back to
    // the commit that produced them.
    let bundle: Arc<Bundle<u64>> = Arc::new(Bundle::with_config(BundleConfig::default()));
    let oracle = Arc::new(LogicalOracle::new());
    let remaining = Arc::new(AtomicU64::new(options.updates));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..options.readers)
        .map(|_| {
            let bundle = Arc::clone(&bundle);
            let oracle = Arc::clone(&oracle);
            let done = Arc::clone(&done);
            thread::spawn(move || reader_loop(&bundle, &*oracle, &done))
        })
        .collect();

    let start = Instant::now();
    let writers: Vec<_> = (0..options.writers)
        .map(|writer| {
            let bundle = Arc::clone(&bundle);
            let oracle = Arc::clone(&oracle);
            let remaining = Arc::clone(&remaining);
            thread::spawn(move || {
                let mut committed = Vec::new();
                let mut seq = 0u64;
                while remaining
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                    .is_ok()
                {
                    let ptr = ((writer as u64) << 32) | seq;
                    bundle.prepare(ptr);
                    let ts = oracle.next_commit();
                    bundle.finalize(ts);
                    committed.push((ts, ptr));
                    seq += 1;
                }
                committed
            })
        })
        .collect();

    let committed: Vec<(Timestamp, u64)> = writers
        .into_iter()
        .flat_map(|w| w.join().expect("writer panicked"))
        .collect();
    let write_elapsed = start.elapsed();

    done.store(true, Ordering::Release);
    let mut reads = 0;
    let mut read_violations = 0;
    for reader in readers {
        let (r, v) = reader.join().expect("reader panicked");
        reads += r;
        read_violations += v;
    }

    let guard = &epoch::pin();
    let (chain_len, chain_error) = match bundle.check_chain(guard) {
        Ok(stats) => (stats.len, None),
        Err(e) => (0, Some(e.to_string())),
    };

    let lookup_violations = committed
        .iter()
        .filter(|(ts, ptr)| bundle.get_ptr_by_timestamp(*ts, guard) != Some(ptr))
        .count() as u64;

    let (read_p50_ns, read_p99_ns) = measure_read_latency(&bundle, &*oracle);

    let safe_ts = oracle.read_timestamp();
    let gc_retired = bundle.gc(safe_ts, guard).versions_retired;
    let gc_error = match bundle.check_chain(guard) {
        Ok(stats) if stats.len == 1 => None,
        Ok(stats) => Some(format!("{} entries left after gc", stats.len)),
        Err(e) => Some(e.to_string()),
    };

    Report {
        writers: options.writers,
        readers: options.readers,
        updates: options.updates,
        write_elapsed,
        reads,
        read_violations,
        chain_len,
        chain_error,
        lookup_violations,
        read_p50_ns,
        read_p99_ns,
        gc_retired,
        gc_error,
    }
}

/// Reads at the oracle's current read timestamp until told to stop.
///
/// A read at `t` must land on a finalized entry committed at or before `t`,
/// and reads issued later must never land on an older entry.
fn reader_loop(bundle: &Bundle<u64>, oracle: &dyn TimestampOracle, done: &AtomicBool) -> (u64, u64) {
    let mut reads = 0;
    let mut violations = 0;
    let mut newest_seen = Timestamp::NULL;

    while !done.load(Ordering::Acquire) {
        let at = oracle.read_timestamp();
        let guard = &epoch::pin();
        let entry = bundle.entry_at(at, guard);
        let ts = entry.ts();
        if entry.is_pending() || ts > at || ts < newest_seen {
            violations += 1;
        }
        newest_seen = newest_seen.max(ts);
        reads += 1;
    }
    (reads, violations)
}

fn measure_read_latency(bundle: &Bundle<u64>, oracle: &dyn TimestampOracle) -> (f64, f64) {
    const ITERATIONS: usize = 100_000;
    let newest = oracle.read_timestamp().as_u64();
    let mut latencies = Vec::with_capacity(ITERATIONS);

    for i in 0..ITERATIONS {
        let at = Timestamp::new((newest.saturating_sub(i as u64 % 64)).max(1));
        let start = Instant::now();
        let guard = &epoch::pin();
        std::hint::black_box(bundle.get_ptr_by_timestamp(at, guard));
        latencies.push(start.elapsed().as_nanos() as f64);
    }

    latencies.sort_by(|a, b| a.total_cmp(b));
    (latencies[ITERATIONS / 2], latencies[ITERATIONS * 99 / 100])
}

fn json_string_or_null(s: &Option<String>) -> String {
    match s {
        Some(v) => format!("\"{}\"", v.replace('"', "'")),
        None => "null".to_string(),
    }
}

fn print_json(report: &Report) {
    println!("{{");
    println!("  \"writers\": {},", report.writers);
    println!("  \"readers\": {},", report.readers);
    println!("  \"updates\": {},", report.updates);
    println!("  \"write_elapsed_ms\": {},", report.write_elapsed.as_millis());
    println!("  \"reads\": {},", report.reads);
    println!("  \"read_violations\": {},", report.read_violations);
    println!("  \"chain_len\": {},", report.chain_len);
    println!("  \"chain_error\": {},", json_string_or_null(&report.chain_error));
    println!("  \"lookup_violations\": {},", report.lookup_violations);
    println!("  \"read_latency_p50_ns\": {:.1},", report.read_p50_ns);
    println!("  \"read_latency_p99_ns\": {:.1},", report.read_p99_ns);
    println!("  \"gc_retired\": {},", report.gc_retired);
    println!("  \"gc_error\": {}", json_string_or_null(&report.gc_error));
    println!("}}");
}

fn print_human(report: &Report) {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Bundle Stress Validation");
    println!("═══════════════════════════════════════════════════════════════\n");

    println!("── Workload ────────────────────────────────────────────────────\n");
    println!("  Writers: {}", report.writers);
    println!("  Readers: {}", report.readers);
    println!("  Updates: {}", report.updates);
    let per_update = report.write_elapsed.as_nanos() as f64 / report.updates as f64;
    println!(
        "  Write phase: {:?} ({:.1} ns per prepare/finalize)",
        report.write_elapsed, per_update
    );

    println!("\n── Linearizability ─────────────────────────────────────────────\n");
    println!("  Concurrent reads: {}", report.reads);
    print_check("No reader observed a pending or future version", report.read_violations);
    print_check("Every commit readable at its own timestamp", report.lookup_violations);

    println!("\n── Chain Shape ─────────────────────────────────────────────────\n");
    match &report.chain_error {
        None => println!("  ✓ {} entries, strictly descending, tail reachable", report.chain_len),
        Some(e) => println!("  ✗ {}", e),
    }

    println!("\n── Read Latency ────────────────────────────────────────────────\n");
    println!("  P50: {:.1} ns", report.read_p50_ns);
    println!("  P99: {:.1} ns", report.read_p99_ns);

    println!("\n── Garbage Collection ──────────────────────────────────────────\n");
    println!("  Retired: {} versions", report.gc_retired);
    match &report.gc_error {
        None => println!("  ✓ Only the current version remains"),
        Some(e) => println!("  ✗ {}", e),
    }

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  Validation Complete");
    println!("═══════════════════════════════════════════════════════════════");
}

fn print_check(label: &str, violations: u64) {
    if violations == 0 {
        println!("  ✓ {}", label);
    } else {
        println!("  ✗ {}: {} violations", label, violations);
    }
}
