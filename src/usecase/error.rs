//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{PushError, RepositoryError, ValueObjectError};

/// 参加者接続時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// 履歴の取得に失敗した
    #[error("failed to load room history: {0}")]
    Storage(#[from] RepositoryError),

    /// 新規接続へのスナップショット送信に失敗した
    #[error("failed to deliver join snapshot: {0}")]
    Push(#[from] PushError),
}

/// メッセージ送信時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// 入力検証エラー（何も永続化・配信されない）
    #[error("invalid message: {0}")]
    Validation(#[from] ValueObjectError),

    /// ストアへの永続化に失敗した（何も配信されない）
    #[error("failed to persist message: {0}")]
    Storage(#[from] RepositoryError),
}
