/// ANSI color codes for user-facing messages
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub info: &'static str,     // No color for plain information
    pub success: &'static str,  // Bright green for completed work
    pub warning: &'static str,  // Bright yellow for warnings
    pub error: &'static str,    // Bright red for errors
    pub critical: &'static str, // Bold red for batch-level failures
    pub debug: &'static str,    // Bright cyan for debug output
    pub dim: &'static str,      // Dim for progress lines
    pub reset: &'static str,    // Reset to default color
}

impl ColorScheme {
    pub fn new(use_colors: bool) -> Self {
        if use_colors {
            Self {
                info: "",
                success: "\x1b[92m",
                warning: "\x1b[93m",
                error: "\x1b[91m",
                critical: "\x1b[1;31m",
                debug: "\x1b[96m",
                dim: "\x1b[2m",
                reset: "\x1b[0m",
            }
        } else {
            // All empty strings for no-color mode
            Self {
                info: "",
                success: "",
                warning: "",
                error: "",
                critical: "",
                debug: "",
                dim: "",
                reset: "",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_scheme_is_empty() {
        let scheme = ColorScheme::new(false);
        assert!(scheme.error.is_empty() && scheme.reset.is_empty());
        assert_eq!(ColorScheme::new(true).reset, "\x1b[0m");
    }
}
