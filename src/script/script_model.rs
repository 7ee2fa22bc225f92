use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTIVITY: &str = ".MainActivity";

/// Free-text instructions to run against one app, read from YAML:
///
/// ```yaml
/// name: grocery search
/// app: zepto
/// instructions:
///   - Open the app
///   - Search for 'Chocolates'
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstructionScript {
    pub name: String,

    /// App name matched against installed packages
    pub app: String,

    /// Launch activity, relative to the package
    #[serde(default = "default_activity")]
    pub activity: String,

    /// Executed in order, one completion call each
    #[serde(default)]
    pub instructions: Vec<String>,
}

fn default_activity() -> String {
    DEFAULT_ACTIVITY.to_string()
}

impl InstructionScript {
    /// Script from inline instructions; blank lines are dropped.
    pub fn from_lines<I, S>(name: &str, app: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.to_string(),
            app: app.to_string(),
            activity: default_activity(),
            instructions: lines
                .into_iter()
                .map(|l| l.as_ref().trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }
}
