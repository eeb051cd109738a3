use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ESHOP: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/eshop");

fn jsontable() -> Command {
    let mut cmd = Command::cargo_bin("jsontable").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("JSONTABLE_QUEUE_CAPACITY")
        .env_remove("JSONTABLE_TIMEOUT_MS")
        .env_remove("JSONTABLE_MAX_RESULTS")
        .env_remove("JSONTABLE_CLIENT_MODE")
        .arg("--base")
        .arg(ESHOP);
    cmd
}

#[test]
fn lists_tables_sorted() {
    jsontable()
        .arg("tables")
        .assert()
        .success()
        .stdout("tbl_buyer\ntbl_order\n");
}

#[test]
fn lists_tables_matching_pattern() {
    jsontable()
        .args(["tables", "--pattern", "order"])
        .assert()
        .success()
        .stdout("tbl_order\n");

    jsontable()
        .args(["tables", "--pattern", "ORDER"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn describes_table_as_json() {
    jsontable()
        .args(["--format", "json", "describe", "tbl_order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"table\": \"tbl_order\""))
        .stdout(predicate::str::contains("\"type\": \"NUMBER\""))
        .stdout(predicate::str::contains("\"sql_type\": \"DOUBLE\""));
}

#[test]
fn scans_rows_as_json_lines() {
    jsontable()
        .args(["--format", "json", "scan", "tbl_order"])
        .assert()
        .success()
        .stdout(concat!(
            "{\"order_id\":10001,\"buyer_id\":\"u234152\",\"amount\":27.53,\"is_prepaid\":false}\n",
            "{\"order_id\":10002,\"buyer_id\":\"u100231\",\"amount\":9.9,\"is_prepaid\":true}\n",
            "{\"order_id\":10003,\"buyer_id\":\"u234152\",\"amount\":120.0,\"is_prepaid\":true}\n",
        ));
}

#[test]
fn scans_projected_columns_with_defaults() {
    jsontable()
        .args(["--format", "json", "scan", "tbl_buyer", "--columns", "vip,name"])
        .assert()
        .success()
        .stdout(concat!(
            "{\"name\":\"Ada\",\"vip\":true}\n",
            "{\"name\":\"Grace\",\"vip\":false}\n",
        ));
}

#[test]
fn fail_on_missing_rejects_incomplete_rows() {
    jsontable()
        .args(["--fail-on-missing", "scan", "tbl_buyer"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("'vip' is missing"));
}

#[test]
fn warns_when_result_is_capped() {
    jsontable()
        .args(["--max-results", "2", "scan", "tbl_order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(2 rows)"))
        .stderr(predicate::str::contains("limit of 2 rows"));
}

#[test]
fn no_warning_when_table_fits_the_cap_exactly() {
    jsontable()
        .args(["--max-results", "3", "scan", "tbl_order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(3 rows)"))
        .stderr(predicate::str::contains("limit of").not());
}

#[test]
fn stream_is_not_capped() {
    jsontable()
        .args(["--max-results", "2", "--format", "json", "scan", "tbl_order", "--stream"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10003"))
        .stderr(predicate::str::contains("warning").not());
}

#[test]
fn stream_honours_limit() {
    jsontable()
        .args(["--embedded", "-f", "json", "scan", "tbl_order", "--stream", "--limit", "1"])
        .assert()
        .success()
        .stdout("{\"order_id\":10001,\"buyer_id\":\"u234152\",\"amount\":27.53,\"is_prepaid\":false}\n");
}

#[test]
fn unknown_table_fails() {
    jsontable()
        .args(["scan", "missing_table"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("table 'missing_table' does not exist"));
}

#[test]
fn bad_base_path_fails_at_startup() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("jsontable")
        .unwrap()
        .arg("--base")
        .arg(dir.path())
        .arg("tables")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to open database"))
        .stderr(predicate::str::contains("meta.json"));
}
