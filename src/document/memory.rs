//! Memory profiles for the streaming back-end

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How many rows per sheet the streaming back-end keeps in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemoryProfile {
    /// Small containers (< 512MB): 50 rows
    Low,
    /// 512MB to 1GB: 100 rows
    #[default]
    Medium,
    /// Above 1GB: 1000 rows
    High,
    /// Explicit window
    Custom { row_access_window: usize },
}

impl MemoryProfile {
    /// Pick a profile from the memory available to the process (MB)
    pub fn from_memory_mb(memory_mb: usize) -> Self {
        if memory_mb < 512 {
            MemoryProfile::Low
        } else if memory_mb < 1024 {
            MemoryProfile::Medium
        } else {
            MemoryProfile::High
        }
    }

    /// Rows kept in memory per sheet
    pub fn row_access_window(&self) -> usize {
        match self {
            MemoryProfile::Low => 50,
            MemoryProfile::Medium => 100,
            MemoryProfile::High => 1000,
            MemoryProfile::Custom { row_access_window } => *row_access_window,
        }
    }
}
