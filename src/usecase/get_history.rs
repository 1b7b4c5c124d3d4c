//! UseCase: メッセージ履歴取得処理

use std::sync::Arc;

use crate::domain::{Message, MessageRepository, RepositoryError, RoomId};

/// メッセージ履歴取得のユースケース
///
/// HTTP の履歴エンドポイントから呼ばれる薄いラッパー。`limit` の範囲検証
/// （1..=100）は UI 層が行う。
pub struct GetHistoryUseCase {
    /// Repository（メッセージ永続化ストアの抽象化）
    repository: Arc<dyn MessageRepository>,
}

impl GetHistoryUseCase {
    /// 新しい GetHistoryUseCase を作成
    pub fn new(repository: Arc<dyn MessageRepository>) -> Self {
        Self { repository }
    }

    /// Room の直近のメッセージを時系列順（古い順）で取得する
    pub async fn execute(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.repository.get_recent_messages(room_id, limit).await
    }
}
