//! # Process Memory Statistics
//!
//! Reads the current process's memory footprint.
//!
//! Resident and virtual size come from `sysinfo` on every platform. On Linux,
//! peak resident size and thread count are added from `/proc/self/status`;
//! elsewhere peak falls back to the current resident size and threads stay
//! zero. A failed process lookup yields zeros: memory statistics are a
//! best-effort gauge and must never fail a snapshot build.

use sysinfo::{ProcessesToUpdate, System};

/// Memory footprint of the current process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Resident set size, bytes.
    pub resident: i64,
    /// Peak resident set size, bytes (`VmHWM` on Linux).
    pub peak_resident: i64,
    /// Virtual memory size, bytes.
    pub virtual_size: i64,
    /// Number of OS threads (`Threads` on Linux).
    pub threads: i64,
}

impl MemoryStats {
    /// Sample the current process.
    #[must_use]
    pub fn current() -> Self {
        let mut stats = sample_process().unwrap_or_default();
        if let Some(status) = read_proc_status() {
            let proc = Self::parse_proc_status(&status);
            stats.peak_resident = proc.peak_resident;
            stats.threads = proc.threads;
        }
        stats.peak_resident = stats.peak_resident.max(stats.resident);
        stats
    }

    /// Parse the contents of a `/proc/<pid>/status` file.
    ///
    /// Unknown lines are ignored; missing or malformed keys stay zero.
    #[must_use]
    pub fn parse_proc_status(status: &str) -> Self {
        let mut stats = Self::default();
        for line in status.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            match key {
                "VmRSS" => stats.resident = parse_kib(rest),
                "VmHWM" => stats.peak_resident = parse_kib(rest),
                "VmSize" => stats.virtual_size = parse_kib(rest),
                "Threads" => stats.threads = rest.trim().parse().unwrap_or(0),
                _ => {}
            }
        }
        stats
    }
}

/// Resident and virtual size of this process via `sysinfo`.
fn sample_process() -> Option<MemoryStats> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let process = system.process(pid)?;
    Some(MemoryStats {
        resident: i64::try_from(process.memory()).unwrap_or(i64::MAX),
        virtual_size: i64::try_from(process.virtual_memory()).unwrap_or(i64::MAX),
        ..MemoryStats::default()
    })
}

/// Parse a `"   1234 kB"` value into bytes.
fn parse_kib(value: &str) -> i64 {
    value
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<i64>().ok())
        .map(|kib| kib.saturating_mul(1024))
        .unwrap_or(0)
}

#[cfg(target_os = "linux")]
fn read_proc_status() -> Option<String> {
    std::fs::read_to_string("/proc/self/status").ok()
}

#[cfg(not(target_os = "linux"))]
fn read_proc_status() -> Option<String> {
    None
}
