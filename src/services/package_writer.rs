//! 写包服务 - 业务能力层
//!
//! 把生成的卡片按分组整理成一个包写到输出目录。写入先落到临时文件再改名，
//! 中途失败不会留下半个包。

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::error::PersistenceError;
use crate::models::OutputRecord;

/// 包名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageName {
    /// 定期检查点
    Intermediary(usize),
    /// 会话崩溃后的转储
    Dump(usize),
    /// 最终结果
    Final,
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageName::Intermediary(n) => write!(f, "intermediary_{}", n),
            PackageName::Dump(n) => write!(f, "dump_{}", n),
            PackageName::Final => f.write_str("final"),
        }
    }
}

/// 包的去处
pub trait PackageSink {
    /// 写出一个包，返回写入的位置
    fn write_package(
        &self,
        name: PackageName,
        records: &[OutputRecord],
    ) -> Result<PathBuf, PersistenceError>;
}

#[derive(Debug, Serialize)]
struct Package<'a> {
    name: String,
    created_at: String,
    collections: Vec<Collection<'a>>,
}

#[derive(Debug, Serialize)]
struct Collection<'a> {
    name: &'a str,
    records: Vec<Card<'a>>,
}

#[derive(Debug, Serialize)]
struct Card<'a> {
    question: &'a str,
    answer: &'a str,
}

/// 按首次出现的顺序分组
fn group_records(records: &[OutputRecord]) -> Vec<Collection<'_>> {
    let mut collections: Vec<Collection<'_>> = Vec::new();
    for record in records {
        let card = Card {
            question: &record.question,
            answer: &record.answer,
        };
        match collections.iter_mut().find(|c| c.name == record.group) {
            Some(collection) => collection.records.push(card),
            None => collections.push(Collection {
                name: &record.group,
                records: vec![card],
            }),
        }
    }
    collections
}

/// 以 JSON 文件形式写包
#[derive(Debug, Clone)]
pub struct JsonPackageWriter {
    out_dir: PathBuf,
}

impl JsonPackageWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// 某个包会被写到的路径
    pub fn path_for(&self, name: PackageName) -> PathBuf {
        self.out_dir.join(format!("{}.json", name))
    }
}

impl PackageSink for JsonPackageWriter {
    fn write_package(
        &self,
        name: PackageName,
        records: &[OutputRecord],
    ) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.out_dir).map_err(|source| PersistenceError::CreateDir {
            path: self.out_dir.clone(),
            source,
        })?;

        let package = Package {
            name: name.to_string(),
            created_at: chrono::Local::now().to_rfc3339(),
            collections: group_records(records),
        };
        let body = serde_json::to_string_pretty(&package).map_err(|source| {
            PersistenceError::Serialize {
                name: name.to_string(),
                source,
            }
        })?;

        let path = self.path_for(name);
        let tmp_path = self.out_dir.join(format!(".{}.json.tmp", name));
        fs::write(&tmp_path, body).map_err(|source| PersistenceError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;

        debug!("写入包 {} ({} 条记录)", path.display(), records.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(group: &str, q: &str) -> OutputRecord {
        OutputRecord {
            group: group.to_string(),
            question: q.to_string(),
            answer: format!("{} answer", q),
        }
    }

    #[test]
    fn package_names() {
        assert_eq!(PackageName::Intermediary(2).to_string(), "intermediary_2");
        assert_eq!(PackageName::Dump(1).to_string(), "dump_1");
        assert_eq!(PackageName::Final.to_string(), "final");
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let records = vec![
            record("Gemini::B", "q1"),
            record("Gemini::A", "q2"),
            record("Gemini::B", "q3"),
        ];
        let collections = group_records(&records);
        let names: Vec<_> = collections.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Gemini::B", "Gemini::A"]);
        assert_eq!(collections[0].records.len(), 2);
    }

    #[test]
    fn writes_json_package() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonPackageWriter::new(dir.path().join("out"));

        let path = writer
            .write_package(PackageName::Final, &[record("Gemini::A", "q1")])
            .unwrap();

        assert_eq!(path, dir.path().join("out").join("final.json"));
        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["name"], "final");
        assert_eq!(value["collections"][0]["name"], "Gemini::A");
        assert_eq!(value["collections"][0]["records"][0]["question"], "q1");
        assert!(!dir.path().join("out").join(".final.json.tmp").exists());
    }

    #[test]
    fn unwritable_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let writer = JsonPackageWriter::new(blocker.join("out"));

        let err = writer.write_package(PackageName::Dump(1), &[]).unwrap_err();
        assert!(matches!(err, PersistenceError::CreateDir { .. }));
    }
}
