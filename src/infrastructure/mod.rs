//! Infrastructure 層
//!
//! ドメイン層が定義するインターフェースの具体的な実装と、
//! 接続管理・配信・死活監視などのランタイム部品を提供します。

pub mod dto;
pub mod fanout;
pub mod heartbeat;
pub mod registry;
pub mod repository;
