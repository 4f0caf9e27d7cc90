use datascribe::{ExecutionRequest, ScribeError, SystemRunner, ToolRunner};

#[test]
fn test_captures_trimmed_stdout() {
    let output = SystemRunner
        .output(&ExecutionRequest::new("echo").arg("  carved  "))
        .unwrap();
    assert_eq!(output, "carved");
}

#[test]
fn test_arguments_are_not_shell_interpreted() {
    let output = SystemRunner
        .output(&ExecutionRequest::new("echo").arg("$(id -u); rm -rf /tmp/x | cat"))
        .unwrap();
    assert_eq!(output, "$(id -u); rm -rf /tmp/x | cat");
}

#[test]
fn test_missing_binary_is_tool_not_found() {
    let err = SystemRunner
        .execute(&ExecutionRequest::new("datascribe-no-such-tool-4f1c"))
        .unwrap_err();
    assert!(matches!(err, ScribeError::ToolNotFound(name) if name == "datascribe-no-such-tool-4f1c"));
}

#[test]
fn test_non_zero_exit_keeps_stderr_verbatim() {
    let request = ExecutionRequest::new("sh")
        .arg("-c")
        .arg("echo 'binwalk: bad magic at 0x1F' >&2; exit 3");
    let err = SystemRunner.execute(&request).unwrap_err();

    match err {
        ScribeError::ExternalToolFailure {
            program,
            status,
            stderr,
        } => {
            assert_eq!(program, "sh");
            assert_eq!(status, Some(3));
            assert_eq!(stderr, "binwalk: bad magic at 0x1F");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_spawn_reports_failure_without_error() {
    let result = SystemRunner.spawn(&ExecutionRequest::new("false")).unwrap();
    assert!(!result.success());
    assert_eq!(result.status(), Some(1));
}
