use crate::state::parse_page_url;
use crate::{AppState, Effect, Msg, UserError};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::FetchSubmitted => {
            if state.is_loading() || state.input().trim().is_empty() {
                return (state, Vec::new());
            }
            match parse_page_url(state.input()) {
                Some(url) => {
                    let request_id = state.begin_fetch(url.clone());
                    vec![Effect::FetchPage { request_id, url }]
                }
                None => {
                    state.set_error(UserError::InvalidUrl);
                    Vec::new()
                }
            }
        }
        Msg::FetchDone { request_id, result } => {
            state.finish_fetch(request_id, result);
            Vec::new()
        }
        Msg::ImageToggled(url) => {
            if !state.is_downloading() {
                state.toggle_image(&url);
            }
            Vec::new()
        }
        Msg::ImageToggledAt(index) => {
            if !state.is_downloading() {
                if let Some(url) = state.image_at(index) {
                    state.toggle_image(&url);
                }
            }
            Vec::new()
        }
        Msg::SelectAll => {
            if !state.is_downloading() {
                state.select_all();
            }
            Vec::new()
        }
        Msg::ClearSelection => {
            if !state.is_downloading() {
                state.clear_selection();
            }
            Vec::new()
        }
        Msg::DownloadClicked => {
            if state.is_downloading() || state.selection().is_empty() {
                Vec::new()
            } else {
                let (request_id, images) = state.begin_download();
                vec![Effect::BuildPdf { request_id, images }]
            }
        }
        Msg::DownloadDone { request_id, result } => {
            state.finish_download(request_id, result);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
