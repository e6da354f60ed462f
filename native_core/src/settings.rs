use serde::{Deserialize, Serialize};

/// Per-block compression applied by the output codec.
///
/// The method is recorded in every frame, so readers need no setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "method")]
pub enum CompressionMethod {
    #[default]
    None,
    Zstd {
        /// 1 = fast / larger, 22 = slow / smallest.
        #[serde(default = "default_zstd_level")]
        level: i32,
    },
    Lz4,
}

fn default_zstd_level() -> i32 {
    3
}

/// Options recognized by the Native adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NativeSettings {
    /// Append a statistics trailer after the suffix (output) and expect one
    /// after the suffix (input). When off, progress goes to the codec.
    pub statistics_trailer: bool,
    /// Also zero the progress counters when an adapter is reset.
    pub reset_progress_on_reset: bool,
    pub compression: CompressionMethod,
}

/// Settings handed to format creators by the [`FormatFactory`](crate::FormatFactory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FormatSettings {
    pub native: NativeSettings,
}
