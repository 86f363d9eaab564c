use crate::overlay::settings::OverlaySettings;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub const OVERLAY_SETTINGS_FILE_NAME: &str = "overlay_settings.json";

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(OVERLAY_SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

pub fn load() -> Result<OverlaySettings> {
    let path = resolve_settings_path()?;
    load_from_path(&path)
}

pub fn save(settings: &OverlaySettings) -> Result<PathBuf> {
    let path = resolve_settings_path()?;
    save_to_path(&path, settings)?;
    Ok(path)
}

/// Loads settings, falling back to defaults when the file is missing or blank.
pub fn load_from_path(path: &Path) -> Result<OverlaySettings> {
    if !path.exists() {
        return Ok(OverlaySettings::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read overlay settings file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(OverlaySettings::default());
    }

    let mut loaded: OverlaySettings = serde_json::from_str(&content)
        .with_context(|| format!("deserialize overlay settings file {}", path.display()))?;
    if loaded.sanitize() {
        tracing::warn!(path = %path.display(), "overlay settings contained out-of-range values");
    }
    Ok(loaded)
}

pub fn save_to_path(path: &Path, settings: &OverlaySettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create overlay settings folder {}", parent.display()))?;
    }

    let mut sanitized = settings.clone();
    sanitized.sanitize();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize overlay settings")?;
    std::fs::write(path, json)
        .with_context(|| format!("write overlay settings file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{load_from_path, save_to_path, settings_path_from_exe_path, OVERLAY_SETTINGS_FILE_NAME};
    use crate::overlay::settings::OverlaySettings;
    use std::path::Path;

    #[test]
    fn settings_path_is_resolved_next_to_executable() {
        let exe = Path::new("/tmp/recorder/bin/overlay_host");
        let path = settings_path_from_exe_path(exe).expect("path");
        assert_eq!(
            path,
            Path::new("/tmp/recorder/bin").join(OVERLAY_SETTINGS_FILE_NAME)
        );
    }

    #[test]
    fn missing_or_blank_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(OVERLAY_SETTINGS_FILE_NAME);
        assert_eq!(load_from_path(&path).expect("load"), OverlaySettings::default());

        std::fs::write(&path, "  \n").expect("write blank");
        assert_eq!(load_from_path(&path).expect("load"), OverlaySettings::default());
    }

    #[test]
    fn store_roundtrip_serialization() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(OVERLAY_SETTINGS_FILE_NAME);

        let settings = OverlaySettings {
            pen_color: "#112233".into(),
            pen_size: 12,
            recording: false,
            ..OverlaySettings::default()
        };
        save_to_path(&path, &settings).expect("save settings");
        assert_eq!(load_from_path(&path).expect("load settings"), settings);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(OVERLAY_SETTINGS_FILE_NAME);
        std::fs::write(&path, "{ not json").expect("write");
        let err = load_from_path(&path).expect_err("malformed");
        assert!(format!("{err:#}").contains(OVERLAY_SETTINGS_FILE_NAME));
    }

    #[test]
    fn out_of_range_values_are_sanitized_on_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(OVERLAY_SETTINGS_FILE_NAME);
        std::fs::write(&path, r#"{ "pen_size": 0, "visual_scale": 0.1 }"#).expect("write");
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded.pen_size, 1);
        assert_eq!(loaded.visual_scale, 0.55);
    }

    #[test]
    fn oversized_fade_timing_is_clamped_on_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(OVERLAY_SETTINGS_FILE_NAME);
        std::fs::write(
            &path,
            r#"{ "stroke_fade_ms": 18446744073709551615, "stroke_tail_ms": 18446744073709551615 }"#,
        )
        .expect("write");
        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded.stroke_fade_ms, 60_000);
        assert_eq!(loaded.stroke_tail_ms, 60_000);
        assert_eq!(loaded.stroke_policy().lifetime_ms(), 120_000);
    }
}
