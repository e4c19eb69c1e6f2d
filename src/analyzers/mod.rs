//! Per-segment analyzers. Each one reads parsed segments plus the shared
//! rule database and appends its findings to a [`crate::report::Report`].

pub mod formids;
pub mod gpu;
pub mod plugins;
pub mod records;
pub mod settings;
pub mod suspects;

pub use formids::{extract_formids, FormIdAnalyzer};
pub use gpu::{detect_gpu, GpuInfo};
pub use plugins::{LogPlugins, PluginAnalyzer, PluginMap};
pub use records::RecordScanner;
pub use settings::{CrashgenSettings, SettingValue, SettingsValidator};
pub use suspects::{check_dll_crash, SuspectFindings, SuspectScanner};
