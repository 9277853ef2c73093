//! End-to-end tests of the document commands: headings, search, replace,
//! format, edit and db inspect/structure. DOCX fixtures are built in-test as ZIP
//! packages; results are checked by reopening them with the library.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use desk_clerk::docx::Document;

fn clerk_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("clerk");
    path
}

fn run_clerk(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = clerk_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(dir.join("no-config.toml"))
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run clerk binary at {:?}: {}", binary, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

const NS: &str = "xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"";

fn heading(level: u32, text: &str) -> String {
    format!(
        "<w:p><w:pPr><w:pStyle w:val=\"Heading{}\"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>",
        level, text
    )
}

fn paragraph(runs: &str) -> String {
    format!("<w:p>{}</w:p>", runs)
}

fn run(text: &str) -> String {
    format!("<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r>", text)
}

fn bold_run(text: &str) -> String {
    format!(
        "<w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r>",
        text
    )
}

fn minimal_docx(body: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", opts).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        zip.start_file("word/document.xml", opts).unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document {}><w:body>{}<w:sectPr/></w:body></w:document>",
            NS, body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

fn document_xml(path: &Path) -> String {
    let bytes = fs::read(path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

fn paragraph_texts(path: &Path) -> Vec<String> {
    let doc = Document::open(path).unwrap();
    doc.paragraphs()
        .iter()
        .map(|r| doc.paragraph(r).unwrap().text())
        .collect()
}

#[test]
fn test_headings_rerooted_listing_and_numbered_copy() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("docs");
    fs::create_dir_all(&src).unwrap();
    let body = [
        heading(1, "Manual"),
        heading(2, "Setup:"),
        heading(3, "Install"),
        paragraph(&run("Body text")),
        heading(2, "Usage"),
    ]
    .concat();
    fs::write(src.join("manual.docx"), minimal_docx(&body)).unwrap();
    fs::write(src.join("~$manual.docx"), b"lock").unwrap();
    let out = tmp.path().join("out");

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &["headings", src.to_str().unwrap(), "--out", out.to_str().unwrap()],
    );
    assert!(success, "headings failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Processed 1 document(s)"));

    let listing = fs::read_to_string(out.join("manual_headings.txt")).unwrap();
    assert_eq!(listing, "1 Setup\n1.1 Install\n2 Usage\n");

    let texts = paragraph_texts(&out.join("manual_numbered.docx"));
    assert_eq!(
        texts,
        vec!["Manual", "1-Setup", "   1.1-Install", "Body text", "2-Usage"]
    );
}

#[test]
fn test_headings_outline_scheme() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.docx");
    let body = [heading(1, "A"), heading(2, "B"), heading(1, "C")].concat();
    fs::write(&file, minimal_docx(&body)).unwrap();
    let out = tmp.path().join("out");

    let (_, stderr, success) = run_clerk(
        tmp.path(),
        &[
            "headings",
            file.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--scheme",
            "outline",
            "--no-docx",
        ],
    );
    assert!(success, "headings failed: {}", stderr);
    assert_eq!(
        fs::read_to_string(out.join("a_headings.txt")).unwrap(),
        "1 A\n1.1 B\n2 C\n"
    );
    assert!(!out.join("a_numbered.docx").exists());
}

fn search_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("files");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("notes.txt"),
        "alpha\nbeta invoice 12\ngamma INVOICE 7\n",
    )
    .unwrap();
    fs::write(
        dir.join("report.docx"),
        minimal_docx(&paragraph(&format!("{}{}", run("Invoice "), bold_run("99 due")))),
    )
    .unwrap();
    fs::write(dir.join("image.png"), b"\x89PNG").unwrap();
    tmp
}

#[test]
fn test_search_text_and_docx() {
    let tmp = search_fixture();
    let dir = tmp.path().join("files");

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &["search", dir.to_str().unwrap(), r"invoice \d+", "--regex"],
    );
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("notes.txt (2 matches)"), "stdout: {}", stdout);
    assert!(stdout.contains("line [2]: beta [[invoice 12]]"));
    assert!(stdout.contains("line [3]: gamma [[INVOICE 7]]"));
    assert!(stdout.contains("report.docx (1 matches)"));
    assert!(stdout.contains("[[Invoice 99]] due"));
    assert!(stdout.contains("Total: 3 matches in 2 file(s), 2 file(s) searched"));
}

#[test]
fn test_search_json_case_sensitive() {
    let tmp = search_fixture();
    let dir = tmp.path().join("files");

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &[
            "search",
            dir.to_str().unwrap(),
            "invoice",
            "--case-sensitive",
            "--kind",
            "txt",
            "--json",
        ],
    );
    assert!(success, "search failed: {}", stderr);
    let results: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["status"], "searched");
    let matches = results[0]["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["line_no"], 2);
}

#[test]
fn test_search_rejects_empty_pattern() {
    let tmp = search_fixture();
    let dir = tmp.path().join("files");
    let (_, _, success) = run_clerk(tmp.path(), &["search", dir.to_str().unwrap(), ""]);
    assert!(!success);
}

#[test]
fn test_replace_keeps_surrounding_formatting() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("files");
    fs::create_dir_all(&dir).unwrap();
    let docx = dir.join("letter.docx");
    let body = paragraph(&format!(
        "{}{}{}",
        run("Dear "),
        bold_run("ACME"),
        run(" team, ACME thanks you.")
    ));
    fs::write(&docx, minimal_docx(&body)).unwrap();
    fs::write(dir.join("plain.txt"), "ACME inc\n").unwrap();
    fs::write(dir.join("untouched.txt"), "nothing here\n").unwrap();

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &[
            "replace",
            dir.to_str().unwrap(),
            "ACME",
            "Acme Ltd",
            "--case-sensitive",
            "--italic",
        ],
    );
    assert!(success, "replace failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Total: 3 replacement(s) in 2 file(s)"), "stdout: {}", stdout);

    assert_eq!(fs::read_to_string(dir.join("plain.txt")).unwrap(), "Acme Ltd inc\n");

    let doc = Document::open(&docx).unwrap();
    let refs = doc.body_paragraphs();
    let p = doc.paragraph(&refs[0]).unwrap();
    assert_eq!(p.text(), "Dear Acme Ltd team, Acme Ltd thanks you.");
    let runs = p.runs();
    assert_eq!(runs[0].text, "Dear ");
    assert_eq!(runs[0].format().italic, None);
    let replaced: Vec<_> = runs.iter().filter(|r| r.text == "Acme Ltd").collect();
    assert_eq!(replaced.len(), 2);
    assert!(replaced.iter().all(|r| r.format().italic == Some(true)));
    assert!(!document_xml(&docx).contains("ACME"));
}

#[test]
fn test_format_headings_only() {
    let tmp = TempDir::new().unwrap();
    let docx = tmp.path().join("doc.docx");
    let body = [heading(1, "Title"), paragraph(&run("Body"))].concat();
    fs::write(&docx, minimal_docx(&body)).unwrap();

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &[
            "format",
            docx.to_str().unwrap(),
            "--target",
            "headings-only",
            "--bold",
            "--color",
            "#ff0000",
        ],
    );
    assert!(success, "format failed: {}", stderr);
    assert!(stdout.contains("1 paragraph(s) formatted"));

    let doc = Document::open(&docx).unwrap();
    let refs = doc.body_paragraphs();
    let title = doc.paragraph(&refs[0]).unwrap().runs()[0].format();
    assert_eq!(title.bold, Some(true));
    assert_eq!(title.color.as_deref(), Some("FF0000"));
    let body = doc.paragraph(&refs[1]).unwrap().runs()[0].format();
    assert_eq!(body.bold, None);
}

#[test]
fn test_format_requires_a_style() {
    let tmp = TempDir::new().unwrap();
    let docx = tmp.path().join("doc.docx");
    fs::write(&docx, minimal_docx(&paragraph(&run("x")))).unwrap();
    let (_, _, success) = run_clerk(tmp.path(), &["format", docx.to_str().unwrap()]);
    assert!(!success);
}

#[test]
fn test_edit_remove_blank_and_insert() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("notes.txt");
    fs::write(&file, "title\n\n\nbody\nend\n").unwrap();

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &[
            "edit",
            "remove-blank",
            file.to_str().unwrap(),
            "body",
            "--before",
            "--all",
        ],
    );
    assert!(success, "edit failed: {}", stderr);
    assert!(stdout.contains("Total: 2 edit(s) in 1 file(s)"));
    assert_eq!(fs::read_to_string(&file).unwrap(), "title\nbody\nend\n");

    let (_, stderr, success) = run_clerk(
        tmp.path(),
        &[
            "edit",
            "insert",
            file.to_str().unwrap(),
            "title",
            "--text",
            " *",
            "--repeat",
            "2",
        ],
    );
    assert!(success, "insert failed: {}", stderr);
    assert_eq!(fs::read_to_string(&file).unwrap(), "title * *\nbody\nend\n");
}

#[test]
fn test_edit_docx_removes_blank_paragraph() {
    let tmp = TempDir::new().unwrap();
    let docx = tmp.path().join("doc.docx");
    let body = [
        paragraph(&run("Key line")),
        paragraph(""),
        paragraph(&run("After")),
    ]
    .concat();
    fs::write(&docx, minimal_docx(&body)).unwrap();

    let (_, stderr, success) = run_clerk(
        tmp.path(),
        &["edit", "remove-blank", docx.to_str().unwrap(), "key"],
    );
    assert!(success, "edit failed: {}", stderr);
    assert_eq!(paragraph_texts(&docx), vec!["Key line", "After"]);
}

#[tokio::test]
async fn test_db_inspect_json() {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
    use sqlx::Connection;

    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("data.sqlite");
    let opts = SqliteConnectOptions::new().filename(&db).create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&opts).await.unwrap();
    for sql in [
        "CREATE TABLE parts (id INTEGER PRIMARY KEY, label TEXT, qty INTEGER)",
        "INSERT INTO parts (label, qty) VALUES ('gear', 2), ('', 0)",
    ] {
        sqlx::query(sql).execute(&mut conn).await.unwrap();
    }
    conn.close().await.unwrap();

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &["db", "inspect", db.to_str().unwrap(), "--no-prompt", "--json"],
    );
    assert!(success, "db inspect failed: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let tables = v[0]["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["name"], "parts");
    assert_eq!(tables[0]["rows"], 1);
    assert_eq!(tables[0]["columns"], 3);
}

#[tokio::test]
async fn test_db_structure_json() {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
    use sqlx::Connection;

    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("data.sqlite");
    let opts = SqliteConnectOptions::new().filename(&db).create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&opts).await.unwrap();
    sqlx::query("CREATE TABLE parts (id INTEGER PRIMARY KEY, label VARCHAR(40), made DATE)")
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();

    let (stdout, stderr, success) = run_clerk(
        tmp.path(),
        &["db", "structure", db.to_str().unwrap(), "--no-prompt", "--json"],
    );
    assert!(success, "db structure failed: {}", stderr);
    let v: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let columns = v[0]["tables"][0]["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[1]["name"], "label");
    assert_eq!(columns[1]["declared_type"], "VARCHAR(40)");
    assert_eq!(columns[1]["size"], 40);
    assert_eq!(columns[0]["primary_key"], true);

    let (stdout, _, success) = run_clerk(tmp.path(), &["db", "structure", db.to_str().unwrap(), "--no-prompt"]);
    assert!(success);
    assert!(stdout.contains("- made -> Date/Time [DATE]"));
}
