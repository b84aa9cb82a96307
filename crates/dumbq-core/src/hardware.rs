//! Hardware profile and slot quota derivation.
//!
//! Capacity is detected once at startup: core count from the OS, memory
//! and swap totals from `/proc/meminfo`, host identity via
//! [`crate::identity`]. One schedulable slot exists per CPU core.

use std::ops::RangeInclusive;
use std::path::Path;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::identity;

/// Node capacity, derived once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct HardwareProfile {
    /// Number of CPU cores — one slot each.
    pub cores: u32,
    /// Total memory in KB.
    pub total_memory_kb: u64,
    /// Total swap in KB.
    pub total_swap_kb: u64,
    /// Stable host identity.
    pub host_uuid: String,
    /// First console tty; 0 disables the console subsystem.
    pub base_tty: u32,
}

/// Per-slot resource quota handed to the container launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuota {
    pub cpu_per_slot: u32,
    pub mem_per_slot_kb: u64,
    /// Swap limit per slot. Sized as swap share + memory share so the
    /// full memory quota can page out once.
    pub swap_per_slot_kb: u64,
}

impl HardwareProfile {
    /// Detect the node profile from the running system.
    pub fn detect(config: &Config) -> CoreResult<Self> {
        let cores = std::thread::available_parallelism()
            .map_err(|e| CoreError::CoreCount(e.to_string()))?
            .get() as u32;
        let (total_memory_kb, total_swap_kb) = read_meminfo(Path::new("/proc/meminfo"))?;
        let host_uuid = identity::host_uuid(config);

        Ok(Self {
            cores,
            total_memory_kb,
            total_swap_kb,
            host_uuid,
            base_tty: config.base_tty,
        })
    }

    /// Build a profile from known values (used by tests and tools).
    pub fn from_parts(
        cores: u32,
        total_memory_kb: u64,
        total_swap_kb: u64,
        host_uuid: impl Into<String>,
        base_tty: u32,
    ) -> Self {
        Self {
            cores,
            total_memory_kb,
            total_swap_kb,
            host_uuid: host_uuid.into(),
            base_tty,
        }
    }

    /// Derive the per-slot quota. Each of the `cores` slots receives an
    /// equal share of memory and swap.
    pub fn slot_quota(&self) -> SlotQuota {
        let slots = self.cores.max(1) as u64;
        let mem_per_slot_kb = self.total_memory_kb / slots;
        SlotQuota {
            cpu_per_slot: 1,
            mem_per_slot_kb,
            swap_per_slot_kb: self.total_swap_kb / slots + mem_per_slot_kb,
        }
    }

    /// Highest tty index in the console range.
    pub fn max_tty(&self) -> u32 {
        self.base_tty + self.cores.saturating_sub(1)
    }

    /// The console tty range, one tty per slot. `None` when consoles are
    /// disabled.
    pub fn tty_range(&self) -> Option<RangeInclusive<u32>> {
        if self.base_tty == 0 {
            return None;
        }
        Some(self.base_tty..=self.max_tty())
    }

    /// Human label for the reserved tty range ("tty3" or "tty[3-6]").
    pub fn tty_range_label(&self) -> Option<String> {
        let range = self.tty_range()?;
        if range.start() == range.end() {
            Some(format!("tty{}", range.start()))
        } else {
            Some(format!("tty[{}-{}]", range.start(), range.end()))
        }
    }
}

/// Read `MemTotal` and `SwapTotal` (KB) from a meminfo-format file.
fn read_meminfo(path: &Path) -> CoreResult<(u64, u64)> {
    let content = std::fs::read_to_string(path).map_err(|source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_meminfo(&content)
}

fn parse_meminfo(content: &str) -> CoreResult<(u64, u64)> {
    let mut mem = None;
    let mut swap = None;
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest.split_whitespace().next();
        match key.trim() {
            "MemTotal" => mem = value.and_then(|v| v.parse::<u64>().ok()),
            "SwapTotal" => swap = value.and_then(|v| v.parse::<u64>().ok()),
            _ => {}
        }
    }
    let mem = mem.ok_or_else(|| CoreError::Meminfo("MemTotal missing".to_string()))?;
    Ok((mem, swap.unwrap_or(0)))
}
