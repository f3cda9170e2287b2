//! End-to-end runner tests against a scripted stand-in for tmux.
//!
//! The script speaks just enough of the control mode protocol for these tests.
//! The socket name (`-L`) selects its behavior, so one script serves all of them.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use tempfile::TempDir;
use tmux_runner::{active_session, Column, Config, Error, ErrorKind, Runner, TmuxBinary};

const FAKE_TMUX: &str = r#"#!/bin/sh
socket=default
if [ "$1" = "-L" ]; then
    socket="$2"
    shift 2
fi

if [ "$1" != "-C" ]; then
    if [ "$socket" = "broken" ]; then
        echo "open terminal failed: permission denied" >&2
        exit 1
    fi
    case "$1" in
        list-sessions)
            if [ "$socket" = "fresh" ]; then
                echo "no server running on /tmp/tmux-test/fresh" >&2
                exit 1
            fi
            echo main
            ;;
        display-message)
            echo main
            ;;
        *)
            echo "unknown command: $1" >&2
            exit 1
            ;;
    esac
    exit 0
fi

n=0
printf '%%begin 1700000000 %d 0\n%%end 1700000000 %d 0\n' "$n" "$n"

while IFS= read -r line; do
    n=$((n + 1))
    case "$line" in
        notify*)
            printf '%%sessions-changed\n%%window-add @9\n%%output %%0 noise\n'
            ;;
    esac
    printf '%%begin 1700000000 %d 1\n' "$n"
    status=end
    case "$line" in
        list-sessions*)
            case "$socket" in
                fresh) echo tmux-ctrl-1 ;;
                none) echo main ;;
                two) printf 'main\nctrl-1\nctrl-2\n' ;;
                *) printf 'main\ntmux-ctrl-1\n' ;;
            esac
            ;;
        kill-session*)
            if [ "$socket" = "kill-fails" ]; then
                echo "can't find session: tmux-ctrl-1"
                status=error
            fi
            ;;
        notify*)
            echo after-notify
            ;;
        say\ *)
            printf '%s\n' "${line#say }"
            ;;
        hang*)
            sleep 5
            ;;
        die*)
            echo partial
            exit 0
            ;;
        attach*)
            echo "can't find session: missing"
            status=error
            ;;
        list-windows*window_width*)
            echo "200 50"
            ;;
        list-windows*)
            echo "@3"
            ;;
        list-panes*)
            printf '%%0 120\n%%2 79\n'
            ;;
        resize-pane* | new-session*)
            ;;
        *)
            echo "unknown command: $line"
            status=error
            ;;
    esac
    printf '%%%s 1700000000 %d 1\n' "$status" "$n"
done
"#;

fn fake_tmux() -> PathBuf {
    static DIR: OnceLock<TempDir> = OnceLock::new();

    let dir = DIR.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tmux");
        fs::write(&path, FAKE_TMUX).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("tmux")
}

fn config(socket: &str) -> Config {
    Config::default()
        .with_tmux_path(fake_tmux())
        .with_socket(socket)
}

fn process_exists(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_init_resolves_scratch_session() {
    let runner = Runner::init(config("default")).await.unwrap();

    assert_eq!(runner.scratch_session(), "tmux-ctrl-1");
    assert!(runner.is_usable());

    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_init_without_running_server() {
    let runner = Runner::init(config("fresh")).await.unwrap();

    assert_eq!(runner.scratch_session(), "tmux-ctrl-1");
    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_init_fails_without_new_session() {
    let err = Runner::init(config("none")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Bootstrap);
    assert!(matches!(err, Error::AmbiguousScratchSession { ref found } if found.is_empty()));
}

#[tokio::test]
async fn test_init_fails_with_two_new_sessions() {
    let err = Runner::init(config("two")).await.unwrap_err();

    match err {
        Error::AmbiguousScratchSession { found } => assert_eq!(found, vec!["ctrl-1", "ctrl-2"]),
        other => panic!("Expected AmbiguousScratchSession, got {:?}", other),
    }
}

#[tokio::test]
async fn test_init_fails_without_executable() {
    let config = Config::default().with_tmux_path("/nonexistent/tmux");
    let err = Runner::init(config).await.unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Bootstrap);
}

#[tokio::test]
async fn test_run_output_and_errors() {
    let mut runner = Runner::init(config("default")).await.unwrap();

    let output = runner.run("list-sessions -F '#{session_name}'").await.unwrap();
    assert_eq!(output, "main\ntmux-ctrl-1");

    let err = runner.run("attach -t missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(err.to_string().contains("can't find session: missing"));

    // A host error does not disturb the framing of the next command
    assert_eq!(runner.run("say hello world").await.unwrap(), "hello world");

    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_notifications_are_skipped() {
    let mut runner = Runner::init(config("default")).await.unwrap();

    assert_eq!(runner.run("notify").await.unwrap(), "after-notify");
    assert_eq!(runner.run("say next").await.unwrap(), "next");

    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_stream_closed_mid_response() {
    let mut runner = Runner::init(config("default")).await.unwrap();

    let err = runner.run("die").await.unwrap_err();
    assert!(matches!(err, Error::Stream { .. }));
    assert!(err.is_fatal());

    // The runner must be discarded; further commands are refused
    assert!(!runner.is_usable());
    assert!(matches!(runner.run("say again").await, Err(Error::Poisoned)));

    // close still returns the failure but terminates the process
    assert!(runner.close().await.is_err());
}

#[tokio::test]
async fn test_command_timeout_poisons_runner() {
    let config = config("default").with_command_timeout(Duration::from_millis(200));
    let mut runner = Runner::init(config).await.unwrap();

    let err = runner.run("hang").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(!runner.is_usable());

    assert!(runner.close().await.is_err());
}

#[tokio::test]
async fn test_close_kills_process_even_if_kill_session_fails() {
    let runner = Runner::init(config("kill-fails")).await.unwrap();
    let pid = runner.process_id().unwrap();
    assert!(process_exists(pid));

    let err = runner.close().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(err.to_string().contains("can't find session"));

    assert!(!process_exists(pid));
}

#[tokio::test]
async fn test_close_kills_process() {
    let mut runner = Runner::init(config("default")).await.unwrap();
    assert!(runner.is_alive());
    let pid = runner.process_id().unwrap();

    runner.close().await.unwrap();
    assert!(!process_exists(pid));
}

#[tokio::test]
async fn test_session_helpers() {
    let mut runner = Runner::init(config("default")).await.unwrap();

    assert_eq!(runner.list_sessions().await.unwrap(), vec!["main", "tmux-ctrl-1"]);

    // Already running: no new-session is sent
    runner.start_session("main").await.unwrap();
    runner.start_session("work").await.unwrap();

    let err = runner.attach_session("missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);

    let name = active_session(runner.tmux()).await.unwrap();
    assert_eq!(name, "main");

    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_window_pane_and_column_helpers() {
    let mut runner = Runner::init(config("default")).await.unwrap();

    assert_eq!(runner.active_window().await.unwrap(), "@3");
    assert_eq!(runner.active_window_dimensions().await.unwrap(), (200, 50));

    runner.set_pane_width("%2", 79).await.unwrap();

    let columns = runner.list_columns().await.unwrap();
    assert_eq!(
        columns,
        vec![
            Column { pane: "%0".into(), width: 120 },
            Column { pane: "%2".into(), width: 79 },
        ]
    );

    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_independent_runners() {
    // One resolved executable serves runners on different servers
    let tmux = TmuxBinary::locate(&config("default")).unwrap();

    let (a, b) = tokio::join!(
        Runner::start(config("default"), tmux.clone()),
        Runner::start(config("fresh"), tmux.clone()),
    );
    let (mut a, mut b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.tmux().socket_args(), ["-L", "default"]);
    assert_eq!(b.tmux().socket_args(), ["-L", "fresh"]);
    assert_eq!(b.config().socket.as_deref(), Some("fresh"));

    assert_eq!(a.run("say a").await.unwrap(), "a");
    assert_eq!(b.run("say b").await.unwrap(), "b");

    a.close().await.unwrap();
    b.close().await.unwrap();
}

#[tokio::test]
async fn test_start_uses_socket_from_config() {
    // The binary was located for "default", but the config selects "none",
    // whose server creates no new session
    let tmux = TmuxBinary::locate(&config("default")).unwrap();
    let err = Runner::start(config("none"), tmux).await.unwrap_err();

    assert!(matches!(err, Error::AmbiguousScratchSession { .. }));
}

#[tokio::test]
async fn test_init_fails_when_snapshot_fails() {
    let err = Runner::init(config("broken")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Bootstrap);
    assert!(matches!(err, Error::Snapshot(_)));
    assert!(err.to_string().contains("permission denied"));
}

#[tokio::test]
async fn test_one_shot_failure_outside_init() {
    let tmux = TmuxBinary::locate(&config("broken")).unwrap();
    let err = active_session(&tmux).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OneShot);
    assert!(matches!(err, Error::OneShot { .. }));
}

#[tokio::test]
async fn test_multi_line_command_keeps_responses_aligned() {
    let mut runner = Runner::init(config("default")).await.unwrap();

    let err = runner.run("say A\nsay B").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCommand { .. }));
    assert!(runner.is_usable());

    let err = runner.run("").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCommand { .. }));

    assert_eq!(runner.run("say C").await.unwrap(), "C");

    runner.close().await.unwrap();
}
