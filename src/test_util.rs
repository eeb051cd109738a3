use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub(crate) const ORDER_META: &str = r#"{
  "name": "eshop",
  "tables": [
    {
      "name": "tbl_order",
      "columns": [
        {"name": "order_id", "type": "INTEGER"},
        {"name": "buyer_id", "type": "STRING"},
        {"name": "amount", "type": "NUMBER"},
        {"name": "is_prepaid", "type": "BOOLEAN"}
      ]
    },
    {
      "name": "tbl_buyer",
      "columns": [
        {"name": "buyer_id", "type": "STRING"},
        {"name": "vip", "type": "BOOLEAN"}
      ]
    },
    {
      "name": "audit_order",
      "columns": [
        {"name": "order_id", "type": "INTEGER"}
      ]
    }
  ]
}"#;

pub(crate) const ORDER_PART_0: &str = concat!(
    r#"{"order_id":10001,"buyer_id":"u234152","amount":27.53,"is_prepaid":false,"channel":"web"}"#,
    "\n",
    r#"{"order_id":10002,"buyer_id":"u100231","amount":9.9,"is_prepaid":true,"channel":"app"}"#,
    "\n",
);

pub(crate) const ORDER_PART_1: &str = concat!(
    r#"{"order_id":10003,"buyer_id":"u234152","amount":120,"is_prepaid":true,"channel":"web"}"#,
    "\n",
);

pub(crate) fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// A base directory with the three-table `eshop` database; only
/// `tbl_order` carries data (two files, three records).
pub(crate) fn eshop_db() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(&dir.path().join("_metadata/meta.json"), ORDER_META);
    write_file(&dir.path().join("tbl_order/part-0.json"), ORDER_PART_0);
    write_file(&dir.path().join("tbl_order/part-1.json"), ORDER_PART_1);
    write_file(&dir.path().join("tbl_order/notes.txt"), "not a data file\n");
    fs::create_dir_all(dir.path().join("tbl_buyer")).unwrap();
    dir
}

/// Append `count` sequential order records to `file` under `tbl_order`.
pub(crate) fn write_orders(base: &Path, file: &str, start: i64, count: i64) {
    let mut contents = String::new();
    for id in start..start + count {
        contents.push_str(&format!(
            "{{\"order_id\":{},\"buyer_id\":\"u{}\",\"amount\":{}.5,\"is_prepaid\":{}}}\n",
            id,
            id,
            id,
            id % 2 == 0
        ));
    }
    write_file(&base.join("tbl_order").join(file), &contents);
}
