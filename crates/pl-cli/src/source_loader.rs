use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pl_api::source_type_for_path;
use pl_core::ParleyError;
use walkdir::WalkDir;

use crate::{map_cli_source_path, map_cli_source_read, map_cli_source_scan};

/// A dialogue file and the source type its loader is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DialogueSource {
    pub(crate) source_type: String,
    pub(crate) text: String,
}

pub(crate) fn load_dialogue_source(
    path: &str,
    source_type: Option<&str>,
) -> Result<DialogueSource, ParleyError> {
    let path = resolve_path(path)?;
    if !path.is_file() {
        return Err(ParleyError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("dialogue file does not exist: {}", path.display()),
        ));
    }
    let source_type = match source_type {
        Some(source_type) => source_type.to_string(),
        None => source_type_for_path(&path)
            .ok_or_else(|| {
                ParleyError::new(
                    "CLI_SOURCE_TYPE_UNKNOWN",
                    format!(
                        "cannot tell the dialogue format of {}; pass --source-type",
                        path.display()
                    ),
                )
            })?
            .to_string(),
    };
    let text = fs::read_to_string(&path).map_err(map_cli_source_read)?;
    Ok(DialogueSource { source_type, text })
}

/// A single script document keyed by its file name.
pub(crate) fn load_script_file(path: &str) -> Result<BTreeMap<String, String>, ParleyError> {
    let path = resolve_path(path)?;
    if !path.is_file() {
        return Err(ParleyError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("script file does not exist: {}", path.display()),
        ));
    }
    let key = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "script.xml".to_string());
    let content = fs::read_to_string(&path).map_err(map_cli_source_read)?;
    Ok(BTreeMap::from([(key, content)]))
}

pub(crate) fn resolve_scripts_dir(scripts_dir: &str) -> Result<PathBuf, ParleyError> {
    let absolute = resolve_path(scripts_dir)?;

    if !absolute.exists() {
        return Err(ParleyError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("scripts-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(ParleyError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("scripts-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Every `.xml` file below `scripts_dir`, keyed by its `/`-separated relative path.
pub(crate) fn read_scripts_xml_from_dir(
    scripts_dir: &Path,
) -> Result<BTreeMap<String, String>, ParleyError> {
    let mut scripts = BTreeMap::new();

    for entry in WalkDir::new(scripts_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_xml = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("xml"));
        if !is_xml {
            continue;
        }

        let relative = path
            .strip_prefix(scripts_dir)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");

        let content = fs::read_to_string(path).map_err(map_cli_source_read)?;
        scripts.insert(relative, content);
    }

    if scripts.is_empty() {
        return Err(ParleyError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .xml files under {}", scripts_dir.display()),
        ));
    }

    Ok(scripts)
}

fn resolve_path(raw: &str) -> Result<PathBuf, ParleyError> {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()
        .map_err(map_cli_source_path)?
        .join(path))
}

#[cfg(test)]
mod source_loader_tests {
    use super::*;
    use crate::cli_test_support::*;
    use pl_api::{JSON_SOURCE_TYPE, XML_SOURCE_TYPE};

    #[test]
    fn resolve_scripts_dir_validates_existence_and_directory() {
        let missing = temp_path("missing-dir");
        let missing_err = resolve_scripts_dir(missing.to_string_lossy().as_ref())
            .expect_err("missing path should fail");
        assert_eq!(missing_err.code, "CLI_SOURCE_NOT_FOUND");

        let file_path = temp_path("plain-file");
        write_file(&file_path, "x");
        let file_err = resolve_scripts_dir(file_path.to_string_lossy().as_ref())
            .expect_err("file path should fail");
        assert_eq!(file_err.code, "CLI_SOURCE_NOT_DIR");
    }

    #[test]
    fn read_scripts_xml_from_dir_keeps_xml_files_only() {
        let root = temp_path("scripts-dir");
        write_file(&root.join("shop.xml"), r#"<script id="shop"/>"#);
        write_file(&root.join("data/vendors.XML"), "<vendors/>");
        write_file(&root.join("notes.txt"), "ignored");

        let scripts = read_scripts_xml_from_dir(&root).expect("scan should pass");
        assert_eq!(
            scripts.keys().cloned().collect::<Vec<_>>(),
            vec!["data/vendors.XML".to_string(), "shop.xml".to_string()]
        );
    }

    #[test]
    fn read_scripts_xml_from_dir_errors_when_no_xml_files() {
        let root = temp_path("empty-scripts-dir");
        write_file(&root.join("readme.txt"), "not source");

        let error = read_scripts_xml_from_dir(&root).expect_err("empty source set should fail");
        assert_eq!(error.code, "CLI_SOURCE_EMPTY");
    }

    #[test]
    fn dialogue_source_type_comes_from_flag_or_extension() {
        let json = temp_path("dialogues").join("iolo.json");
        write_file(&json, r#"{"name": "Iolo"}"#);
        let source = load_dialogue_source(&json.to_string_lossy(), None).expect("json");
        assert_eq!(source.source_type, JSON_SOURCE_TYPE);

        let plain = temp_path("dialogues").join("guard.dlg");
        write_file(&plain, r#"<dialogue name="Guard"/>"#);
        let error =
            load_dialogue_source(&plain.to_string_lossy(), None).expect_err("unknown extension");
        assert_eq!(error.code, "CLI_SOURCE_TYPE_UNKNOWN");
        let source = load_dialogue_source(&plain.to_string_lossy(), Some(XML_SOURCE_TYPE))
            .expect("explicit type");
        assert_eq!(source.source_type, XML_SOURCE_TYPE);

        let absent = temp_path("dialogues").join("absent.json");
        let error = load_dialogue_source(&absent.to_string_lossy(), None)
            .expect_err("missing file");
        assert_eq!(error.code, "CLI_SOURCE_NOT_FOUND");
    }

    #[test]
    fn load_script_file_keys_by_file_name() {
        let path = temp_path("single").join("tavern.xml");
        write_file(&path, r#"<script id="tavern"/>"#);
        let scripts = load_script_file(&path.to_string_lossy()).expect("script file");
        assert_eq!(
            scripts.get("tavern.xml").map(String::as_str),
            Some(r#"<script id="tavern"/>"#)
        );
    }
}
