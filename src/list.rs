use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::api::matches::Match;

pub const LOADING: &str = "매치 목록을 불러오는 중...";
pub const NO_MATCHES: &str = "주변에 매치가 없습니다.";
pub const DATE_UNKNOWN: &str = "날짜 미정";

pub struct ListState<'a> {
    pub matches: &'a [Match],
    pub loading: bool,
    pub error: Option<&'a str>,
    pub radius_km: f64,
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

pub fn parse_match_date(value: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// `2026년 10월 20일 19:00`, or the raw string when it is not a wall clock time.
pub fn format_match_date(value: Option<&str>) -> String {
    match value {
        None => DATE_UNKNOWN.to_string(),
        Some(raw) => parse_match_date(raw)
            .map(|date| date.format("%Y년 %m월 %d일 %H:%M").to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}

fn render_match(out: &mut String, index: usize, mat: &Match) -> std::fmt::Result {
    match &mat.district {
        Some(district) => writeln!(out, "{:>2}. {} ({})", index, mat.place_name, district)?,
        None => writeln!(out, "{:>2}. {}", index, mat.place_name)?,
    }
    if let Some(title) = &mat.title {
        writeln!(out, "    {}", title)?;
    }
    writeln!(out, "    날짜: {}", format_match_date(mat.match_date.as_deref()))?;
    let full = if mat.is_full() { " 정원 마감" } else { "" };
    writeln!(
        out,
        "    인원: {} / {} [{}]{}",
        mat.current_player_count, mat.max_player_count, mat.status, full
    )?;
    if let Some(distance) = mat.distance {
        writeln!(out, "    거리: {:.2} km", distance)?;
    }
    writeln!(out, "    #{}", mat.id)
}

/// Render the list exactly as given, this never fetches anything.
pub fn render(state: &ListState<'_>) -> String {
    if state.loading {
        return LOADING.to_string();
    }
    if let Some(error) = state.error {
        return format!("에러: {}", error);
    }
    if state.matches.is_empty() {
        return NO_MATCHES.to_string();
    }

    let mut out = String::new();
    // writing into a String cannot fail
    if state.radius_km > 0.0 {
        let _ = writeln!(out, "🔥 내 주변 {}km 매치 목록", state.radius_km);
    } else {
        let _ = writeln!(out, "🔥 전체 매치 목록");
    }
    for (index, mat) in state.matches.iter().enumerate() {
        let _ = render_match(&mut out, index + 1, mat);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::sample_match;

    fn state<'a>(matches: &'a [Match], loading: bool, error: Option<&'a str>) -> ListState<'a> {
        ListState {
            matches,
            loading,
            error,
            radius_km: 5.0,
        }
    }

    #[test]
    fn test_empty_collection_says_so() {
        assert_eq!(render(&state(&[], false, None)), NO_MATCHES);
    }

    #[test]
    fn test_loading_and_error_win() {
        let matches = [sample_match(1, 37.5, 127.0)];
        assert_eq!(render(&state(&matches, true, None)), LOADING);
        assert_eq!(
            render(&state(&[], false, Some("서버 연결에 실패했습니다."))),
            "에러: 서버 연결에 실패했습니다."
        );
    }

    #[test]
    fn test_match_block() {
        let mut mat = sample_match(3, 37.5, 127.0);
        mat.distance = Some(1.23456);
        let out = render(&state(std::slice::from_ref(&mat), false, None));
        assert!(out.starts_with("🔥 내 주변 5km 매치 목록"));
        assert!(out.contains(" 1. 풋살장 3 (강남구)"));
        assert!(out.contains("날짜: 2026년 10월 20일 19:00"));
        assert!(out.contains("인원: 4 / 10 [모집중]"));
        assert!(out.contains("거리: 1.23 km"));
        assert!(out.contains("#3"));
        assert!(!out.contains("정원 마감"));

        mat.current_player_count = 10;
        let out = render(&state(std::slice::from_ref(&mat), false, None));
        assert!(out.contains("인원: 10 / 10 [모집중] 정원 마감"));
    }

    #[test]
    fn test_dates() {
        assert_eq!(format_match_date(None), DATE_UNKNOWN);
        assert_eq!(
            format_match_date(Some("2026-01-02T03:04:05")),
            "2026년 01월 02일 03:04"
        );
        assert_eq!(format_match_date(Some("내일 저녁")), "내일 저녁");
        assert!(parse_match_date("2026-01-02T03:04:05.123").is_some());
    }
}
