/// GPU details from the system specs section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub primary: String,
    pub secondary: Option<String>,
    pub manufacturer: &'static str,
    /// The other vendor, lowercase, used to flag vendor-specific mods.
    pub rival: Option<&'static str>,
}

impl Default for GpuInfo {
    fn default() -> Self {
        Self {
            primary: "Unknown".to_string(),
            secondary: None,
            manufacturer: "Unknown",
            rival: None,
        }
    }
}

fn value_after_colon(line: &str) -> Option<String> {
    line.split_once(':').map(|(_, rest)| rest.trim().to_string())
}

pub fn detect_gpu(system: &[String]) -> GpuInfo {
    let mut info = GpuInfo::default();

    for line in system {
        if line.contains("GPU #1") {
            if line.contains("AMD") {
                info.primary = "AMD".to_string();
                info.manufacturer = "AMD";
                info.rival = Some("nvidia");
            } else if line.contains("Nvidia") {
                info.primary = "Nvidia".to_string();
                info.manufacturer = "Nvidia";
                info.rival = Some("amd");
            }
            if let Some(name) = value_after_colon(line) {
                info.primary = name;
            }
        } else if line.contains("GPU #2") {
            if let Some(name) = value_after_colon(line) {
                info.secondary = Some(name);
            }
        }
    }

    info
}

/// Report lines for the system section.
///
/// `modules` are the installed extender DLL names; any that carry the rival
/// vendor's name are flagged as built for the wrong GPU.
pub fn gpu_report_lines<S: AsRef<str>>(info: &GpuInfo, modules: &[S]) -> Vec<String> {
    let mut lines = vec![format!(
        "Primary GPU: {} ({})\n",
        info.primary, info.manufacturer
    )];
    if let Some(secondary) = &info.secondary {
        lines.push(format!("Secondary GPU: {}\n", secondary));
    }
    if let Some(rival) = info.rival {
        for module in modules.iter().map(AsRef::as_ref) {
            if module.to_lowercase().contains(rival) {
                lines.push(format!(
                    "# ❌ CAUTION : {} looks like a mod for {} GPUs, but your primary GPU is {} # \n-----\n",
                    module, rival, info.manufacturer
                ));
            }
        }
    }
    lines.push("\n".to_string());
    lines
}
