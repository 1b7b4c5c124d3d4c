//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{
    entity::Message,
    error::RepositoryError,
    value_object::{MessageContent, RoomId, Username},
};

/// Message Repository trait
///
/// メッセージ永続化ストアへのインターフェース。
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
///
/// ## 依存性の逆転（DIP）
///
/// - ドメイン層が必要とするインターフェースをドメイン層自身が定義
/// - Infrastructure 層がドメイン層のインターフェースに依存
/// - ドメイン層は Infrastructure 層に依存しない
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを永続化する
    ///
    /// メッセージ ID とタイムスタンプはストアが採番する。
    async fn create_message(
        &self,
        room_id: RoomId,
        username: Username,
        content: MessageContent,
    ) -> Result<Message, RepositoryError>;

    /// Room の直近のメッセージを取得する
    ///
    /// 時系列順（最も新しいメッセージが末尾）で最大 `limit` 件を返す。
    /// 呼び出し側は `limit` を 1..=100 の範囲で渡す。
    async fn get_recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError>;
}
