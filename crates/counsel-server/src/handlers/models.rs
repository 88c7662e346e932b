//! `GET /api/models`

use axum::extract::State;
use counsel_upstream::ModelInfo;
use serde::Serialize;

use super::Success;
use crate::{AppState, Store};

#[derive(Debug, Serialize)]
pub struct ModelList {
  pub models: Vec<ModelInfo>,
}

pub async fn list<S: Store>(State(state): State<AppState<S>>) -> Success<ModelList> {
  Success::new(ModelList { models: state.chat.get_available_models() })
}
