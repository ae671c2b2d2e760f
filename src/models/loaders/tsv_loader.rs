use crate::models::record::InputRecord;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// 从导出的 TSV 文件加载卡片
///
/// 跳过开头 `header_lines` 行元数据，之后每个非空行是 `group<TAB>question<TAB>answer`。
pub async fn load_input_records(path: &Path, header_lines: usize) -> Result<Vec<InputRecord>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取输入文件: {}", path.display()))?;

    parse_input_records(&content, header_lines)
        .with_context(|| format!("无法解析输入文件: {}", path.display()))
}

pub fn parse_input_records(content: &str, header_lines: usize) -> Result<Vec<InputRecord>> {
    let mut records = Vec::new();

    for (line_no, line) in content.lines().enumerate().skip(header_lines) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let [group, question, answer] = fields.as_slice() else {
            anyhow::bail!(
                "第 {} 行应有 3 个字段，实际 {} 个",
                line_no + 1,
                fields.len()
            );
        };
        records.push(InputRecord::new(*group, *question, *answer));
    }

    tracing::info!("成功加载 {} 张卡片", records.len());
    Ok(records)
}
