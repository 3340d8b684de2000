use serde::Serialize;
use sysinfo::System;

/// Memory limits offered to the front-end, all in MiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    #[serde(rename = "totalRAM")]
    pub total_ram: u64,
    #[serde(rename = "is32Bit")]
    pub is_32_bit: bool,
    #[serde(rename = "defaultRAM")]
    pub default_ram: u64,
    #[serde(rename = "minRAM")]
    pub min_ram: u64,
    #[serde(rename = "maxRAM")]
    pub max_ram: u64,
}

impl SystemInfo {
    pub fn detect() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let total_mb = system.total_memory() / (1024 * 1024);
        Self::from_total(total_mb, cfg!(target_pointer_width = "32"))
    }

    pub fn from_total(total_ram: u64, is_32_bit: bool) -> Self {
        let (default_ram, min_ram, max_ram) = if is_32_bit {
            (1024, 256, 1024)
        } else {
            (2048, 2048, total_ram)
        };

        Self {
            total_ram,
            is_32_bit,
            default_ram,
            min_ram,
            max_ram,
        }
    }

    /// Raise to the minimum first, then cap at the maximum.
    pub fn clamp_ram(&self, requested: u64) -> u64 {
        let mut ram = requested;
        if ram < self.min_ram {
            ram = self.min_ram;
        }
        if ram > self.max_ram {
            ram = self.max_ram;
        }
        ram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_requests_are_raised_to_the_floor() {
        let info = SystemInfo::from_total(16384, false);
        assert_eq!(info.clamp_ram(100), 2048);
        assert_eq!(info.clamp_ram(4096), 4096);
    }

    #[test]
    fn large_requests_are_capped_at_system_memory() {
        let info = SystemInfo::from_total(8192, false);
        assert_eq!(info.clamp_ram(32768), 8192);
    }

    #[test]
    fn thirty_two_bit_limits() {
        let info = SystemInfo::from_total(4096, true);
        assert_eq!((info.default_ram, info.min_ram, info.max_ram), (1024, 256, 1024));
        assert_eq!(info.clamp_ram(2048), 1024);
        assert_eq!(info.clamp_ram(100), 256);
    }

    #[test]
    fn ceiling_wins_on_tiny_machines() {
        let info = SystemInfo::from_total(1500, false);
        assert_eq!(info.clamp_ram(100), 1500);
    }

    #[test]
    fn serializes_for_the_front_end() {
        let json = serde_json::to_value(SystemInfo::from_total(8192, false)).unwrap();
        assert_eq!(json["totalRAM"], 8192);
        assert_eq!(json["minRAM"], 2048);
        assert_eq!(json["is32Bit"], false);
    }
}
