use encoding_rs::WINDOWS_1251;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Helper struct to manage test directories
struct TestFixture {
    temp_dir: TempDir,
    side_a_dir: PathBuf,
    side_b_dir: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with side A and side B directories
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let side_a_dir = temp_dir.path().join("english");
        let side_b_dir = temp_dir.path().join("russian");

        fs::create_dir(&side_a_dir).expect("Failed to create side A dir");
        fs::create_dir(&side_b_dir).expect("Failed to create side B dir");

        TestFixture {
            temp_dir,
            side_a_dir,
            side_b_dir,
        }
    }

    /// Create a UTF-8 file in the side A directory
    fn create_side_a_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.side_a_dir.join(name);
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Create a Windows-1251 file in the side B directory
    fn create_side_b_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.side_b_dir.join(name);
        let (bytes, _, had_errors) = WINDOWS_1251.encode(content);
        assert!(!had_errors, "content not representable in windows-1251");
        fs::write(&path, &bytes).expect("Failed to write file");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    fn side_a(&self) -> &Path {
        &self.side_a_dir
    }

    fn side_b(&self) -> &Path {
        &self.side_b_dir
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("temp path is not utf-8")
}

/// Helper to run the CLI binary with an isolated config directory
fn run_cli(args: &[&str]) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_subpair_cli");
    let config_dir = TempDir::new().expect("Failed to create config dir");
    Command::new(exe)
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir.path())
        .env("APPDATA", config_dir.path())
        .env("HOME", config_dir.path())
        .env("RUST_LOG", "info")
        .output()
        .expect("Failed to execute command")
}

/// Helper to run CLI and expect success
fn run_cli_success(args: &[&str]) -> std::process::Output {
    let output = run_cli(args);
    if !output.status.success() {
        eprintln!("STDOUT:\n{}", String::from_utf8_lossy(&output.stdout));
        eprintln!("STDERR:\n{}", String::from_utf8_lossy(&output.stderr));
        panic!("Command failed with status: {}", output.status);
    }
    output
}

fn run_cli_json(args: &[&str]) -> Value {
    let output = run_cli_success(args);
    let stdout = String::from_utf8(output.stdout).expect("stdout not utf-8");
    serde_json::from_str(&stdout).expect("invalid json output")
}

fn export(fixture: &TestFixture, output: &Path, extra: &[&str]) -> std::process::Output {
    let mut args = vec![
        "export",
        "--side-a",
        arg(fixture.side_a()),
        "--side-b",
        arg(fixture.side_b()),
        "-o",
        arg(output),
    ];
    args.extend_from_slice(extra);
    run_cli_success(&args)
}

fn import(doc: &Path, a_out: &Path, b_out: &Path, extra: &[&str]) -> std::process::Output {
    let mut args = vec![
        "import",
        arg(doc),
        "--side-a-out",
        arg(a_out),
        "--side-b-out",
        arg(b_out),
    ];
    args.extend_from_slice(extra);
    run_cli_success(&args)
}

fn read_cp1251(path: &Path) -> String {
    let bytes = fs::read(path).expect("Failed to read file");
    let (text, _, had_errors) = WINDOWS_1251.decode(&bytes);
    assert!(!had_errors);
    text.into_owned()
}

#[test]
fn test_export_import_round_trip() {
    let fixture = TestFixture::new();
    fixture.create_side_a_file("ep01.txt", "Hello\nHow are you?\nGoodbye\n");
    fixture.create_side_b_file("ep01.txt", "Привет\nКак дела?\n");
    fixture.create_side_a_file("ep02.txt", "One line");
    fixture.create_side_b_file("ep02.txt", "Одна строка\nИ ещё одна");

    let doc = fixture.path("pairs.docx");
    let output = export(&fixture, &doc, &["--side-b-encoding", "windows-1251"]);
    assert!(doc.is_file());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sections:  2"));

    let a_out = fixture.path("out_en");
    let b_out = fixture.path("out_ru");
    let output = import(&doc, &a_out, &b_out, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("File type: txt (declared)"));
    assert!(stdout.contains("Markers:  structural"));

    assert_eq!(
        fs::read_to_string(a_out.join("ep01.txt")).unwrap(),
        "Hello\nHow are you?\nGoodbye\n"
    );
    assert_eq!(read_cp1251(&b_out.join("ep01.txt")), "Привет\nКак дела?\n\n");
    assert_eq!(fs::read_to_string(a_out.join("ep02.txt")).unwrap(), "One line\n\n");
    assert_eq!(read_cp1251(&b_out.join("ep02.txt")), "Одна строка\nИ ещё одна\n");
}

#[test]
fn test_explicit_srt_list() {
    let fixture = TestFixture::new();
    let a = fixture.create_side_a_file("movie.srt", "1\n00:00:01,000 --> 00:00:02,000\nHi\n");
    let b = fixture.create_side_b_file("movie.srt", "1\n00:00:01,000 --> 00:00:02,000\nПривет\n");

    let doc = fixture.path("subs.docx");
    run_cli_success(&[
        "export",
        "--side-a",
        arg(&a),
        "--side-b",
        arg(&b),
        "-o",
        arg(&doc),
        "--side-b-encoding",
        "windows-1251",
    ]);

    let a_out = fixture.path("out_en");
    let b_out = fixture.path("out_ru");
    import(&doc, &a_out, &b_out, &[]);

    assert_eq!(
        fs::read_to_string(b_out.join("movie.srt")).expect("side B srt should be utf-8"),
        "1\n00:00:01,000 --> 00:00:02,000\nПривет\n"
    );
}

#[test]
fn test_pairs_json_report() {
    let fixture = TestFixture::new();
    fixture.create_side_a_file("shared.txt", "a");
    fixture.create_side_a_file("only_a.txt", "a");
    fixture.create_side_b_file("shared.txt", "б");
    fixture.create_side_b_file("only_b.txt", "б");
    fixture.create_side_b_file("notes.srt", "б");

    let report = run_cli_json(&[
        "pairs",
        "--side-a",
        arg(fixture.side_a()),
        "--side-b",
        arg(fixture.side_b()),
        "--json",
    ]);

    assert_eq!(report["kind"], "txt");
    assert_eq!(report["paired"], serde_json::json!(["shared.txt"]));
    assert_eq!(report["missing_on_b"], serde_json::json!(["only_a.txt"]));
    assert_eq!(report["missing_on_a"], serde_json::json!(["only_b.txt"]));
}

#[test]
fn test_import_does_not_clobber() {
    let fixture = TestFixture::new();
    fixture.create_side_a_file("ep.txt", "Hello");
    fixture.create_side_b_file("ep.txt", "Привет");

    let doc = fixture.path("pairs.docx");
    export(&fixture, &doc, &["--no-run-log"]);

    let a_out = fixture.path("out_en");
    let b_out = fixture.path("out_ru");
    import(&doc, &a_out, &b_out, &["--no-run-log"]);
    import(&doc, &a_out, &b_out, &["--no-run-log"]);

    assert!(a_out.join("ep.txt").is_file());
    assert!(a_out.join("ep_1.txt").is_file());
    assert!(b_out.join("ep_1.txt").is_file());

    import(&doc, &a_out, &b_out, &["--no-run-log", "--overwrite"]);
    assert!(!a_out.join("ep_2.txt").exists());
}

#[test]
fn test_run_logs() {
    let fixture = TestFixture::new();
    fixture.create_side_a_file("shared.txt", "Hello");
    fixture.create_side_a_file("lonely.txt", "Nobody");
    fixture.create_side_b_file("shared.txt", "Привет");

    let doc = fixture.path("pairs.docx");
    export(&fixture, &doc, &[]);

    let export_log = fs::read_to_string(fixture.path("pairs_log.txt")).expect("export log");
    assert!(export_log.contains("lonely.txt"));
    assert!(export_log.contains("Word document saved"));
    assert!(!export_log.contains("\u{1b}["), "run log must be free of ANSI codes");

    import(&doc, &fixture.path("a"), &fixture.path("b"), &[]);
    assert!(fixture.path("pairs_import_log.txt").is_file());

    let quiet = fixture.path("quiet.docx");
    export(&fixture, &quiet, &["--no-run-log"]);
    assert!(quiet.is_file());
    assert!(!fixture.path("quiet_log.txt").exists());
}

#[test]
fn test_missing_document_fails() {
    let fixture = TestFixture::new();
    let a_out = fixture.path("out_en");

    let config_dir = TempDir::new().unwrap();
    assert_cmd::Command::cargo_bin("subpair_cli")
        .unwrap()
        .args([
            "import",
            arg(&fixture.path("missing.docx")),
            "--side-a-out",
            arg(&a_out),
            "--side-b-out",
            arg(&fixture.path("out_ru")),
            "--no-run-log",
        ])
        .env("XDG_CONFIG_HOME", config_dir.path())
        .env("HOME", config_dir.path())
        .assert()
        .failure()
        .code(1);

    assert!(!a_out.exists());
}

#[test]
fn test_mixed_folder_and_file_fails() {
    let fixture = TestFixture::new();
    let b = fixture.create_side_b_file("ep.txt", "Привет");
    fixture.create_side_a_file("ep.txt", "Hello");

    let config_dir = TempDir::new().unwrap();
    assert_cmd::Command::cargo_bin("subpair_cli")
        .unwrap()
        .args([
            "export",
            "--side-a",
            arg(fixture.side_a()),
            "--side-b",
            arg(&b),
            "-o",
            arg(&fixture.path("out.docx")),
        ])
        .env("XDG_CONFIG_HOME", config_dir.path())
        .env("HOME", config_dir.path())
        .assert()
        .failure()
        .code(1);

    assert!(!fixture.path("out.docx").exists());
}

#[test]
fn test_detect() {
    let fixture = TestFixture::new();
    let russian = fixture.create_side_b_file(
        "ru.txt",
        &"Съешь же ещё этих мягких французских булок, да выпей чаю. ".repeat(20),
    );
    let ascii = fixture.create_side_a_file("en.txt", "Plain ASCII text\n");

    let report = run_cli_json(&[
        "detect",
        arg(&russian),
        arg(&ascii),
        "--default",
        "utf-8",
        "--json",
    ]);

    assert_eq!(report[0]["encoding"], "windows-1251");
    assert_eq!(report[0]["detected"], true);
    assert_eq!(report[1]["encoding"], "UTF-8");
    assert_eq!(report[1]["detected"], false);
}

#[test]
fn test_config_init_writes_defaults() {
    let config_dir = TempDir::new().expect("Failed to create config dir");
    let run = |args: &[&str]| {
        let output = Command::new(env!("CARGO_BIN_EXE_subpair_cli"))
            .args(args)
            .env("XDG_CONFIG_HOME", config_dir.path())
            .env("APPDATA", config_dir.path())
            .env("HOME", config_dir.path())
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8(output.stdout).expect("stdout not utf-8")
    };

    let before = run(&["config"]);
    assert!(before.contains("Exists:   false"));

    let after = run(&["config", "--init"]);
    let path = PathBuf::from(after.lines().next().expect("config path line"));
    assert!(after.contains("Exists:   false"));

    let written = fs::read_to_string(&path).expect("config file written");
    assert!(written.contains("side_b_encoding = \"windows-1251\""));
    assert!(run(&["config"]).contains("Exists:   true"));
}
