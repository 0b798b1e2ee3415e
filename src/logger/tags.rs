/// Log tag definitions for module-scoped filtering
///
/// Each tag maps to one area of the crate and to the --debug-<module> flag
/// that enables its debug-level output.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Main,
    Config,
    Pool,
    Link,
    Keepalive,
    Topics,
    Processor,
}

impl LogTag {
    /// Short, fixed-width label shown in log output
    pub fn label(&self) -> &'static str {
        match self {
            LogTag::Main => "MAIN",
            LogTag::Config => "CONFIG",
            LogTag::Pool => "POOL",
            LogTag::Link => "LINK",
            LogTag::Keepalive => "KEEPALIVE",
            LogTag::Topics => "TOPICS",
            LogTag::Processor => "PROCESSOR",
        }
    }

    /// Key used when matching --debug-<module> flags
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::Main => "main",
            LogTag::Config => "config",
            LogTag::Pool => "pool",
            LogTag::Link => "realtime",
            LogTag::Keepalive => "realtime",
            LogTag::Topics => "topics",
            LogTag::Processor => "topics",
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
