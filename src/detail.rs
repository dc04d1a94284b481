use std::fmt::Write;

use crate::{
    api::{matches::MatchDetail, MatchId},
    board::Refresh,
    client::{ApplyOutcome, MatchApi},
    list::format_match_date,
};

pub const APPLY_SUCCEEDED: &str = "신청 성공! 현재 인원수가 변경되었는지 확인하세요.";
pub const COMMUNICATION_FAILED: &str = "서버 통신 중 오류가 발생했습니다.";
pub const DETAIL_UNAVAILABLE: &str = "정보를 불러오지 못했습니다.";
pub const NO_CONTENT: &str = "상세 내용이 없습니다.";

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Closed,
    Loading(MatchId),
    Loaded(MatchDetail),
    /// the fetch failed, shown as "no content" rather than as an error
    Empty(MatchId),
}

/// The detail panel of one selected match and its apply button.
///
/// Both actions take `&mut self`, so a second apply cannot start while one
/// is awaiting the server.
pub struct DetailFlow {
    state: DetailState,
    status: Option<String>,
}

impl Default for DetailFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailFlow {
    pub fn new() -> Self {
        Self {
            state: DetailState::Closed,
            status: None,
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub async fn open<A: MatchApi>(&mut self, api: &A, id: MatchId) -> &DetailState {
        self.state = DetailState::Loading(id);
        self.status = None;
        self.state = match api.match_detail(id).await {
            Ok(detail) => DetailState::Loaded(detail),
            Err(err) => {
                log::warn!("failed to load match {}: {}", id, err);
                DetailState::Empty(id)
            }
        };
        &self.state
    }

    pub fn close(&mut self) {
        self.state = DetailState::Closed;
        self.status = None;
    }

    /// Apply to the open match as `user_id`.
    ///
    /// Only a loaded match can be applied to. Only an accepted application
    /// calls `refresh`, and exactly once; the caller refetches instead of
    /// guessing the new head count.
    pub async fn apply<A: MatchApi, R: Refresh>(
        &mut self,
        api: &A,
        user_id: u64,
        refresh: &mut R,
    ) -> &str {
        let DetailState::Loaded(detail) = &self.state else {
            return self.status.insert(DETAIL_UNAVAILABLE.to_string());
        };
        let id = detail.summary.id;

        let (message, accepted) = match api.apply(id, user_id).await {
            Ok(ApplyOutcome::Accepted { .. }) => (APPLY_SUCCEEDED.to_string(), true),
            Ok(ApplyOutcome::Rejected { message }) => (message, false),
            Ok(ApplyOutcome::Failed { message, .. }) => {
                (format!("알 수 없는 오류: {}", message), false)
            }
            Err(err) => {
                log::warn!("apply to match {} failed: {}", id, err);
                (COMMUNICATION_FAILED.to_string(), false)
            }
        };
        if accepted {
            refresh.refresh().await;
        }
        self.status.insert(message)
    }

    pub fn render(&self) -> String {
        match &self.state {
            DetailState::Closed => String::new(),
            DetailState::Loading(_) => "불러오는 중...".to_string(),
            DetailState::Empty(_) => DETAIL_UNAVAILABLE.to_string(),
            DetailState::Loaded(detail) => {
                let mut out = render_detail(detail);
                if let Some(status) = &self.status {
                    let _ = writeln!(out, "\n{}", status);
                }
                out
            }
        }
    }
}

fn render_detail(detail: &MatchDetail) -> String {
    let mat = &detail.summary;
    let mut out = String::new();
    let title = mat.title.as_deref().unwrap_or(&mat.place_name);
    let _ = writeln!(out, "{} [{}]", title, mat.status);
    let _ = writeln!(
        out,
        "📅 {}",
        format_match_date(mat.match_date.as_deref())
    );
    let _ = writeln!(out, "📍 {}", mat.place_name);
    if let Some(address) = detail.address_name.clone().or_else(|| {
        let address = mat.address();
        (!address.is_empty()).then_some(address)
    }) {
        let _ = writeln!(out, "   {}", address);
    }
    let _ = writeln!(
        out,
        "👥 현재 {}명 / 총 {}명",
        mat.current_player_count, mat.max_player_count
    );
    if let Some(writer) = &detail.writer_name {
        let _ = writeln!(out, "👤 작성자: {}", writer);
    }
    let _ = writeln!(out, "\n상세 내용");
    let _ = write!(
        out,
        "{}",
        mat.description
            .as_deref()
            .filter(|content| !content.trim().is_empty())
            .unwrap_or(NO_CONTENT)
    );
    out
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::{
        api::matches::Match,
        board::{Board, DEFAULT_RADIUS_KM},
        client::{
            testing::{sample_match, FakeApi},
            RequestError,
        },
        geo::Coordinate,
    };

    #[derive(Default)]
    struct Counter(usize);

    impl Refresh for Counter {
        async fn refresh(&mut self) {
            self.0 += 1;
        }
    }

    fn detail_of(mat: Match) -> MatchDetail {
        MatchDetail {
            summary: mat,
            address_name: None,
            writer_name: Some("민수".into()),
        }
    }

    #[tokio::test]
    async fn test_open_loads_or_degrades() {
        let api = FakeApi::default();
        api.detail
            .lock()
            .unwrap()
            .push_back(Ok(detail_of(sample_match(5, 37.5, 127.0))));
        let mut flow = DetailFlow::new();

        let state = flow.open(&api, MatchId(5)).await;
        assert!(matches!(state, DetailState::Loaded(_)));
        assert!(flow.render().contains("👤 작성자: 민수"));
        assert!(flow.render().contains(NO_CONTENT));

        // the fake answers 404 once its queue is empty
        let state = flow.open(&api, MatchId(6)).await;
        assert_eq!(*state, DetailState::Empty(MatchId(6)));
        assert_eq!(flow.render(), DETAIL_UNAVAILABLE);

        flow.close();
        assert_eq!(*flow.state(), DetailState::Closed);
    }

    #[tokio::test]
    async fn test_accepted_apply_refreshes_once() {
        let api = FakeApi::default();
        api.detail
            .lock()
            .unwrap()
            .push_back(Ok(detail_of(sample_match(1, 37.5, 127.0))));
        let mut after = sample_match(1, 37.5, 127.0);
        after.current_player_count = 5;
        api.nearby.lock().unwrap().extend([
            Ok(vec![sample_match(1, 37.5, 127.0)]),
            Ok(vec![after]),
        ]);
        api.applied.lock().unwrap().push_back(Ok(ApplyOutcome::Accepted {
            message: "ok".into(),
        }));

        let mut board = Board::new(&api, Coordinate::DEFAULT_CENTER, DEFAULT_RADIUS_KM);
        board.fetch().await;
        assert_eq!(board.matches()[0].current_player_count, 4);

        let mut flow = DetailFlow::new();
        flow.open(&api, MatchId(1)).await;
        let message = flow.apply(&api, 100, &mut board).await.to_string();
        assert_eq!(message, APPLY_SUCCEEDED);
        assert_eq!(api.calls("nearby"), 2);
        assert_eq!(board.matches()[0].current_player_count, 5);

        let mut counter = Counter::default();
        flow.apply(&api, 100, &mut counter).await;
        assert_eq!(counter.0, 1);
    }

    #[tokio::test]
    async fn test_full_match_shows_server_message() {
        let api = FakeApi::default();
        api.detail
            .lock()
            .unwrap()
            .push_back(Ok(detail_of(sample_match(1, 37.5, 127.0))));
        api.applied.lock().unwrap().push_back(Ok(ApplyOutcome::Rejected {
            message: "정원이 마감되었습니다".into(),
        }));
        let mut flow = DetailFlow::new();
        flow.open(&api, MatchId(1)).await;

        let mut counter = Counter::default();
        let message = flow.apply(&api, 100, &mut counter).await;
        assert_eq!(message, "정원이 마감되었습니다");
        assert_eq!(counter.0, 0);
        assert!(flow.render().ends_with("\n정원이 마감되었습니다\n"));
    }

    #[tokio::test]
    async fn test_other_failures() {
        let api = FakeApi::default();
        api.detail
            .lock()
            .unwrap()
            .push_back(Ok(detail_of(sample_match(1, 37.5, 127.0))));
        api.applied.lock().unwrap().extend([
            Ok(ApplyOutcome::Failed {
                code: 500,
                message: "락 획득 실패".into(),
            }),
            Err(RequestError::OtherResponse(StatusCode::BAD_GATEWAY)),
        ]);
        let mut flow = DetailFlow::new();
        flow.open(&api, MatchId(1)).await;
        let mut counter = Counter::default();

        let message = flow.apply(&api, 100, &mut counter).await;
        assert_eq!(message, "알 수 없는 오류: 락 획득 실패");
        let message = flow.apply(&api, 100, &mut counter).await;
        assert_eq!(message, COMMUNICATION_FAILED);
        assert_eq!(counter.0, 0);
    }

    #[tokio::test]
    async fn test_apply_needs_a_loaded_detail() {
        let api = FakeApi::default();
        let mut flow = DetailFlow::new();
        let mut counter = Counter::default();

        // the fake answers 404 for the detail
        flow.open(&api, MatchId(99)).await;
        assert_eq!(*flow.state(), DetailState::Empty(MatchId(99)));
        let message = flow.apply(&api, 100, &mut counter).await;
        assert_eq!(message, DETAIL_UNAVAILABLE);
        assert_eq!(api.calls("apply"), 0);
        assert_eq!(counter.0, 0);
    }

    #[tokio::test]
    async fn test_apply_without_selection() {
        let api = FakeApi::default();
        let mut flow = DetailFlow::new();
        let mut counter = Counter::default();
        let message = flow.apply(&api, 100, &mut counter).await;
        assert_eq!(message, DETAIL_UNAVAILABLE);
        assert_eq!(api.total_calls(), 0);
    }
}
