use std::fs;
use std::path::Path;
use serde::Deserialize;
use thiserror::Error;

pub const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("locale file not found: {0}")]
    NotFound(String),

    #[error("default locale '{FALLBACK_LANGUAGE}' is missing from the locale directory")]
    DefaultMissing,

    #[error("failed to read locale file {code}.json: {source}")]
    Read { code: String, #[source] source: std::io::Error },

    #[error("invalid locale file {code}.json: {source}")]
    Parse { code: String, #[source] source: serde_json::Error },
}

/// The full set of display strings the UI references. Deserializing a locale
/// file that lacks any of these fields fails, so a half-translated file is
/// rejected up front instead of panicking mid-frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Locale {
    pub title: String,
    pub settings: String,
    pub select_folder: String,
    pub default_save_location: String,
    pub language: String,
    pub always_create_folder: String,
    pub save_settings: String,
    pub settings_saved: String,
    pub select_images: String,
    pub no_file_selected: String,
    pub files_selected: String,
    pub convert: String,
    pub converted_folder: String,
    /// Template taking `{count}` and `{path}`.
    pub success: String,
    /// Template taking `{detail}`.
    pub error: String,
    pub warning: String,
}

impl Locale {
    /// Loads the table for `code` from `<dir>/<code>.json`. A missing file
    /// falls back to the default language once; a missing default is fatal.
    pub fn load(dir: &Path, code: &str) -> Result<Self, LocaleError> {
        match Self::read_file(dir, code) {
            Err(LocaleError::NotFound(_)) if code != FALLBACK_LANGUAGE => {
                log::warn!("locale '{code}' not found, falling back to '{FALLBACK_LANGUAGE}'");
                match Self::read_file(dir, FALLBACK_LANGUAGE) {
                    Err(LocaleError::NotFound(_)) => Err(LocaleError::DefaultMissing),
                    other => other,
                }
            }
            Err(LocaleError::NotFound(_)) => Err(LocaleError::DefaultMissing),
            other => other,
        }
    }

    fn read_file(dir: &Path, code: &str) -> Result<Self, LocaleError> {
        let path = dir.join(format!("{code}.json"));
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LocaleError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(LocaleError::Read { code: code.to_string(), source: e }),
        };
        serde_json::from_str(&contents)
            .map_err(|e| LocaleError::Parse { code: code.to_string(), source: e })
    }

    pub fn success_message(&self, count: usize, path: &str) -> String {
        self.success
            .replace("{count}", &count.to_string())
            .replace("{path}", path)
    }

    pub fn error_message(&self, detail: &str) -> String {
        self.error.replace("{detail}", detail)
    }
}

/// Language codes offered in the settings dialog: the `*.json` stems found
/// in the locale directory, sorted.
pub fn available_languages(dir: &Path) -> Vec<String> {
    let mut codes: Vec<String> = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                path.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string())
            } else {
                None
            }
        })
        .collect();
    codes.sort();
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const EN: &str = include_str!("../../locale/en.json");

    fn locale_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("imgconv_locale_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_requested_language() {
        let dir = locale_dir("requested");
        fs::write(dir.join("en.json"), EN).unwrap();
        let locale = Locale::load(&dir, "en").unwrap();
        assert_eq!(locale.no_file_selected, "No file selected");
    }

    #[test]
    fn missing_language_falls_back_to_default() {
        let dir = locale_dir("fallback");
        fs::write(dir.join("en.json"), EN).unwrap();
        let locale = Locale::load(&dir, "xx").unwrap();
        assert_eq!(locale.convert, "Convert");
    }

    #[test]
    fn missing_default_is_fatal() {
        let dir = locale_dir("no_default");
        let err = Locale::load(&dir, "xx").unwrap_err();
        assert!(matches!(err, LocaleError::DefaultMissing));

        let err = Locale::load(&dir, "en").unwrap_err();
        assert!(matches!(err, LocaleError::DefaultMissing));
    }

    #[test]
    fn incomplete_table_is_rejected() {
        let dir = locale_dir("incomplete");
        fs::write(dir.join("en.json"), r#"{"title": "Image Converter"}"#).unwrap();
        let err = Locale::load(&dir, "en").unwrap_err();
        assert!(matches!(err, LocaleError::Parse { .. }));
    }

    #[test]
    fn templates_substitute_named_parameters() {
        let dir = locale_dir("templates");
        fs::write(dir.join("en.json"), EN).unwrap();
        let locale = Locale::load(&dir, "en").unwrap();
        let msg = locale.success_message(3, "/tmp/out");
        assert!(msg.contains('3'), "{msg}");
        assert!(msg.contains("/tmp/out"), "{msg}");
        assert!(locale.error_message("boom").contains("boom"));
    }

    #[test]
    fn lists_available_languages() {
        let dir = locale_dir("listing");
        fs::write(dir.join("en.json"), EN).unwrap();
        fs::write(dir.join("de.json"), EN).unwrap();
        fs::write(dir.join("notes.txt"), "not a locale").unwrap();
        assert_eq!(available_languages(&dir), vec!["de", "en"]);
    }
}
