use pl_core::ParleyError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> ParleyError {
    ParleyError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: ParleyError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}

pub(crate) fn map_cli_io(error: std::io::Error) -> ParleyError {
    map_error("CLI_IO", error)
}

pub(crate) fn map_tui_io(error: std::io::Error) -> ParleyError {
    map_error("TUI_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> ParleyError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> ParleyError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> ParleyError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_json(error: serde_json::Error) -> ParleyError {
    map_error("CLI_JSON", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(ParleyError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(map_cli_io(std::io::Error::other("io")).code, "CLI_IO");
        assert_eq!(map_tui_io(std::io::Error::other("tui")).code, "TUI_IO");
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );

        let strip_error = std::path::Path::new("/a")
            .strip_prefix("/b")
            .expect_err("strip prefix");
        assert_eq!(map_cli_source_scan(strip_error).code, "CLI_SOURCE_SCAN");

        assert_eq!(
            map_cli_source_read(std::io::Error::other("read")).code,
            "CLI_SOURCE_READ"
        );

        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_cli_json(invalid).code, "CLI_JSON");
    }
}
