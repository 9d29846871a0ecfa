/// Log tags identifying the module a message originates from
///
/// Each tag maps to a `--debug-<key>` command-line flag so diagnostics can
/// be enabled per module without drowning the console.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Webserver,
    Hub,
    RateLimit,
    Monitor,
}

impl LogTag {
    /// Key used for `--debug-<key>` / `--verbose-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Webserver => "webserver",
            LogTag::Hub => "hub",
            LogTag::RateLimit => "ratelimit",
            LogTag::Monitor => "monitor",
        }
        .to_string()
    }

    /// Plain uppercase name for file output (no ANSI colors)
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Webserver => "WEBSRV",
            LogTag::Hub => "HUB",
            LogTag::RateLimit => "RATELIMIT",
            LogTag::Monitor => "MONITOR",
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
