//! 前端边界
//!
//! 终端交互层每次按键调用 [`SuggestionSession::suggest`]，新查询会取消
//! 同一会话中尚未完成的旧查询。用户确认某条建议后调用
//! [`SuggestionSession::on_confirm`]。

use super::ensemble::{Ensemble, ModelSelection};
use super::models::ContextState;
use super::types::RankedCandidate;
use crate::storage::{DataStore, HistoryEntry};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct SuggestionSession {
    ensemble: Arc<Ensemble>,
    store: Arc<dyn DataStore>,
    context: Arc<ContextState>,
    selection: ModelSelection,
    /// 当前未完成查询的编号与取消令牌
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
    next_query: AtomicU64,
}

impl SuggestionSession {
    pub fn new(
        ensemble: Arc<Ensemble>,
        store: Arc<dyn DataStore>,
        context: Arc<ContextState>,
        selection: ModelSelection,
    ) -> Self {
        Self {
            ensemble,
            store,
            context,
            selection,
            in_flight: Mutex::new(None),
            next_query: AtomicU64::new(0),
        }
    }

    pub fn selection(&self) -> &ModelSelection {
        &self.selection
    }

    /// 排序后的完整候选；被更新的查询取代时返回 `None`
    pub async fn suggest_ranked(&self, prefix: &str) -> Option<Vec<RankedCandidate>> {
        let id = self.next_query.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.in_flight.lock().replace((id, token.clone())) {
            previous.cancel();
        }

        let result = self
            .ensemble
            .suggest_cancellable(prefix, &self.selection, &token)
            .await;

        let mut in_flight = self.in_flight.lock();
        if matches!(in_flight.as_ref(), Some((current, _)) if *current == id) {
            *in_flight = None;
        }
        result
    }

    /// 展示用的候选文本；被取代的查询返回空列表
    pub async fn suggest(&self, prefix: &str) -> Vec<String> {
        self.suggest_ranked(prefix)
            .await
            .map(|ranked| ranked.into_iter().map(|c| c.text).collect())
            .unwrap_or_default()
    }

    /// 放弃当前查询
    pub fn cancel(&self) {
        if let Some((_, token)) = self.in_flight.lock().take() {
            token.cancel();
        }
    }

    /// 记录用户确认的命令：写入历史（次数 1，当前时间）并更新上下文
    pub async fn on_confirm(&self, selected: &str) {
        let selected = selected.trim();
        if selected.is_empty() {
            return;
        }

        self.context.set_last_command(selected);
        let entry = HistoryEntry::new(selected).with_timestamp(Utc::now());
        if let Err(err) = self.store.upsert_history(&entry).await {
            warn!(error = %err, "completion.session.confirm_store_failed");
        }
    }
}
