#[cfg(test)]
mod session_tests {
    use std::fs;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use rox::error::{LoxError, EXIT_IO};
    use rox::session::{read_source, Session};

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rox-{}-{}", std::process::id(), name));
        fs::write(&path, contents).expect("scratch file is writable");
        path
    }

    #[test]
    fn reads_a_source_file_and_runs_it() {
        let path = scratch_file("ok.lox", b"print 1 + 2;\n");

        let source = read_source(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(source, "print 1 + 2;\n");

        let mut session = Session::new(Vec::new());
        session.run(&source).unwrap();
        assert_eq!(String::from_utf8(session.into_output()).unwrap(), "3\n");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("rox-definitely-missing/none.lox");

        let error = read_source(&path).unwrap_err();

        assert!(matches!(error, LoxError::Io(_)));
        assert_eq!(error.exit_code(), EXIT_IO);
        assert_eq!(error.exit_code(), 74);
    }

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let path = scratch_file("bad.lox", &[b'p', 0xff, 0xfe, b';']);

        let error = read_source(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(error, LoxError::Utf8(_)));
        assert_eq!(error.exit_code(), EXIT_IO);
    }
}
