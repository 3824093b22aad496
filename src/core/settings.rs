use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write settings file: {0}")]
    Write(#[source] std::io::Error),

    #[error("malformed settings line {line_no}: {line:?}")]
    MalformedLine { line_no: usize, line: String },
}

/// User preferences persisted between runs as plain `key=value` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub save_location: String,
    pub language: String,
    pub always_create_folder: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_location: String::new(),
            language: "en".to_string(),
            always_create_folder: false,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults for a missing
    /// file or missing keys. A non-empty line without `=` is a hard error.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(settings),
            Err(e) => return Err(SettingsError::Read(e)),
        };

        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                SettingsError::MalformedLine { line_no: idx + 1, line: line.to_string() }
            })?;
            match key {
                "save_location" => settings.save_location = value.to_string(),
                "language" => settings.language = value.to_string(),
                "always_create_folder" => settings.always_create_folder = value == "True",
                _ => {}
            }
        }

        Ok(settings)
    }

    /// Overwrites `path` with exactly the three settings keys.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Write)?;
        }
        let contents = format!(
            "save_location={}\nlanguage={}\nalways_create_folder={}\n",
            self.save_location,
            self.language,
            if self.always_create_folder { "True" } else { "False" },
        );
        fs::write(path, contents).map_err(SettingsError::Write)
    }

    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("image_converter");
        path.push("settings.txt");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("imgconv_settings_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join("settings.txt")
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_file("missing");
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.language, "en");
        assert!(!settings.always_create_folder);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let path = temp_file("roundtrip");
        let settings = Settings {
            save_location: "/tmp/out".to_string(),
            language: "de".to_string(),
            always_create_folder: true,
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn save_writes_exactly_three_keys() {
        let path = temp_file("three_keys");
        Settings::default().save(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec!["save_location=", "language=en", "always_create_folder=False"]
        );
    }

    #[test]
    fn malformed_line_is_fatal() {
        let path = temp_file("malformed");
        fs::write(&path, "save_location=/tmp\nthis line has no separator\n").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::MalformedLine { line_no: 2, .. }));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let path = temp_file("unknown");
        fs::write(&path, "language=fr\nfuture_flag=on\n").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.language, "fr");
        assert!(settings.save_location.is_empty());
    }

    #[test]
    fn only_literal_true_enables_folder_flag() {
        let path = temp_file("flag");
        fs::write(&path, "always_create_folder=true\n").unwrap();
        assert!(!Settings::load(&path).unwrap().always_create_folder);
        fs::write(&path, "always_create_folder=True\n").unwrap();
        assert!(Settings::load(&path).unwrap().always_create_folder);
    }
}
