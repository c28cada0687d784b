#[cfg(test)]
mod tests {
    use crate::{DocumentExporter, DocumentImporter, LineReader, PairMatcher};
    use encoding_rs::WINDOWS_1251;
    use std::fs;
    use std::path::{Path, PathBuf};
    use subpair_common::{AppConfig, FileKind, PairOrder};
    use tempfile::TempDir;

    struct Workspace {
        temp: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let temp = TempDir::new().expect("Failed to create temp dir");
            for dir in ["src_a", "src_b"] {
                fs::create_dir(temp.path().join(dir)).expect("Failed to create dir");
            }
            Self { temp }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.temp.path().join(name)
        }

        fn side_a(&self, name: &str, lines: &[&str]) -> PathBuf {
            let path = self.path("src_a").join(name);
            fs::write(&path, lines.join("\n")).expect("Failed to write side A");
            path
        }

        fn side_b(&self, name: &str, lines: &[&str]) -> PathBuf {
            let path = self.path("src_b").join(name);
            let text = lines.join("\n");
            let (bytes, _, _) = WINDOWS_1251.encode(&text);
            fs::write(&path, &bytes).expect("Failed to write side B");
            path
        }
    }

    fn read(path: &Path, default: &str) -> Vec<String> {
        LineReader::default()
            .read_lines(path, default, Some(default))
            .expect("Failed to read lines")
    }

    // ============================================================================
    // Export -> import
    // ============================================================================

    #[test]
    fn test_round_trip_pads_to_longest_side() {
        let ws = Workspace::new();
        let cases: [(&str, &[&str], &[&str]); 3] = [
            ("even.txt", &["one", "two"], &["один", "два"]),
            ("long_a.txt", &["  indented", "second", "third"], &["первый"]),
            ("long_b.txt", &["only"], &["раз", "", "три", "четыре"]),
        ];
        for (name, a, b) in cases {
            ws.side_a(name, a);
            ws.side_b(name, b);
        }

        let plan = PairMatcher::default()
            .from_folders(&ws.path("src_a"), &ws.path("src_b"), None)
            .unwrap();
        let doc = ws.path("pairs.docx");
        DocumentExporter::default()
            .export(&plan, &doc, Some("cp1251"), None)
            .unwrap();

        let summary = DocumentImporter::default()
            .import(&doc, &ws.path("out_a"), &ws.path("out_b"), false, None)
            .unwrap();
        assert_eq!(summary.kind, FileKind::Txt);
        assert_eq!(summary.written.len(), 3);

        for (name, a, b) in cases {
            let len = a.len().max(b.len());
            let recovered_a = read(&ws.path("out_a").join(name), "utf-8");
            let recovered_b = read(&ws.path("out_b").join(name), "cp1251");

            assert_eq!(recovered_a.len(), len, "{name} side A");
            assert_eq!(recovered_b.len(), len, "{name} side B");
            for i in 0..len {
                assert_eq!(recovered_a[i], a.get(i).copied().unwrap_or(""), "{name} A line {i}");
                assert_eq!(recovered_b[i], b.get(i).copied().unwrap_or(""), "{name} B line {i}");
            }
        }
    }

    #[test]
    fn test_round_trip_srt_writes_utf8_side_b() {
        let ws = Workspace::new();
        let subtitle = ["1", "00:00:01,000 --> 00:00:02,500", "Hi there", ""];
        let translated = ["1", "00:00:01,000 --> 00:00:02,500", "Привет", ""];
        let a = ws.side_a("ep01.srt", &subtitle);
        let b = ws.side_b("ep01.srt", &translated);

        let plan = PairMatcher::default().from_paths(&[a], &[b]).unwrap();
        let doc = ws.path("subs.docx");
        DocumentExporter::default()
            .export(&plan, &doc, Some("windows-1251"), None)
            .unwrap();
        DocumentImporter::default()
            .import(&doc, &ws.path("out_a"), &ws.path("out_b"), false, None)
            .unwrap();

        let bytes = fs::read(ws.path("out_b").join("ep01.srt")).unwrap();
        let text = String::from_utf8(bytes).expect("side B should be UTF-8");
        assert_eq!(text, "1\n00:00:01,000 --> 00:00:02,500\nПривет\n");
    }

    #[test]
    fn test_pairing_completeness() {
        let ws = Workspace::new();
        ws.side_a("shared.txt", &["a"]);
        ws.side_a("left_only.txt", &["a"]);
        ws.side_b("shared.txt", &["б"]);
        ws.side_b("right_only.txt", &["б"]);

        let plan = PairMatcher::default()
            .from_folders(&ws.path("src_a"), &ws.path("src_b"), Some(FileKind::Txt))
            .unwrap();
        let doc = ws.path("pairs.docx");
        let summary = DocumentExporter::default()
            .export(&plan, &doc, None, None)
            .unwrap();
        assert_eq!(summary.warnings.len(), 2);

        let parsed = DocumentImporter::default().parse(&doc).unwrap();
        let names: Vec<_> = parsed
            .document
            .sections
            .iter()
            .map(|s| s.basename.as_str())
            .collect();
        assert_eq!(names, vec!["shared.txt"]);
    }

    #[test]
    fn test_explicit_list_first_seen_order() {
        let ws = Workspace::new();
        let a = vec![ws.side_a("z.txt", &["z"]), ws.side_a("a.txt", &["a"])];
        let b = vec![ws.side_b("a.txt", &["а"]), ws.side_b("z.txt", &["з"])];

        let config = AppConfig {
            pair_order: PairOrder::FirstSeen,
            ..Default::default()
        };
        let plan = PairMatcher::new(&config).from_paths(&a, &b).unwrap();
        let doc = ws.path("ordered.docx");
        DocumentExporter::new(&config)
            .export(&plan, &doc, None, None)
            .unwrap();

        let parsed = DocumentImporter::new(&config).parse(&doc).unwrap();
        let names: Vec<_> = parsed
            .document
            .sections
            .iter()
            .map(|s| s.basename.as_str())
            .collect();
        assert_eq!(names, vec!["z.txt", "a.txt"]);
    }

    #[test]
    fn test_invalid_bytes_keep_line_count() {
        let ws = Workspace::new();
        ws.side_a("bad.txt", &["ok", "fine"]);
        let b = ws.path("src_b").join("bad.txt");
        fs::write(&b, b"\xc3\x28 broken\nnext").unwrap();

        let plan = PairMatcher::default()
            .from_folders(&ws.path("src_a"), &ws.path("src_b"), None)
            .unwrap();
        let document = DocumentExporter::default()
            .build_document(&plan, Some("utf-8"), None)
            .unwrap();

        let section = &document.sections[0];
        assert_eq!(section.len(), 2);
        assert!(section.pairs[0].side_b.contains('\u{FFFD}'));
        assert_eq!(section.pairs[1].side_b, "next");
    }
}
