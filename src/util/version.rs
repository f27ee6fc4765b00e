pub const APP_NAME: &str = "Design Quote";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

pub fn version_label() -> String {
    let base = match GIT_TAG {
        Some(tag) => tag.to_string(),
        None => format!("v{APP_VERSION}"),
    };
    match GIT_COMMIT {
        Some(commit) => format!("{base} ({commit})"),
        None => base,
    }
}

/// User agent for outgoing HTTP requests.
pub fn user_agent() -> String {
    format!("design-quote/{APP_VERSION}")
}
