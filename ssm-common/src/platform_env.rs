//! Environment-derived platform lookups.
//!
//! Grounded on `ssm/package.py::determine_platform`/`determine_platforms`.

use std::env;

/// The platform a package should be considered to target.
///
/// If `package_platform` is `None`, `"all"`, or `"multi"`, falls back to
/// the `SSM_PLATFORM` environment variable. Returns `None` if neither
/// yields a usable label.
pub fn determine_platform(package_platform: Option<&str>) -> Option<String> {
    determine_platform_configured(package_platform, &[])
}

/// As [`determine_platform`], but also substitutes the environment
/// platform for any label in `disabled_publish_platforms` (the
/// configured platforms a package should never be published to
/// directly, per the `[defaults]` config section).
pub fn determine_platform_configured(
    package_platform: Option<&str>,
    disabled_publish_platforms: &[String],
) -> Option<String> {
    match package_platform {
        Some(p) if p != "all" && p != "multi" && !disabled_publish_platforms.iter().any(|d| d == p) => {
            Some(p.to_string())
        }
        _ => env::var("SSM_PLATFORM").ok().filter(|s| !s.is_empty()),
    }
}

/// The space-separated list of platforms from `SSM_PLATFORMS`, falling
/// back to `SSMUSE_PLATFORMS`.
pub fn determine_platforms() -> Vec<String> {
    let raw = env::var("SSM_PLATFORMS")
        .ok()
        .or_else(|| env::var("SSMUSE_PLATFORMS").ok());
    raw.map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_concrete_platform_directly() {
        assert_eq!(
            determine_platform(Some("linux26-x86-64")),
            Some("linux26-x86-64".to_string())
        );
    }

    #[test]
    fn falls_back_for_virtual_platforms_without_env() {
        // Neither SSM_PLATFORM nor the virtual labels resolve without an
        // environment override, which this test does not set.
        if env::var_os("SSM_PLATFORM").is_none() {
            assert_eq!(determine_platform(Some("all")), None);
            assert_eq!(determine_platform(None), None);
        }
    }

    #[test]
    fn configured_disabled_platform_falls_back_like_a_sentinel() {
        if env::var_os("SSM_PLATFORM").is_none() {
            let disabled = vec!["headnode".to_string()];
            assert_eq!(determine_platform_configured(Some("headnode"), &disabled), None);
            assert_eq!(
                determine_platform_configured(Some("linux26-x86-64"), &disabled),
                Some("linux26-x86-64".to_string())
            );
        }
    }
}
