//! 业务能力层
//!
//! 每个服务只描述"我能做什么"：解析一条回答，写一个包。

pub mod package_writer;
pub mod response_parser;

pub use package_writer::{JsonPackageWriter, PackageName, PackageSink};
pub use response_parser::{parse_qa_pairs, strip_code_fence};
