//! Leaderboard ranking and end-of-session awards

use serde::{Deserialize, Serialize};

/// Final or live standing input for ranking
#[derive(Debug, Clone)]
pub struct PlayerStanding {
    pub player_id: String,
    pub display_name: String,
    pub is_teacher: bool,
    pub join_order: usize,
    pub total_score: i64,
    pub best_streak: u32,
}

/// One ranked leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub player_id: String,
    pub display_name: String,
    pub is_teacher: bool,
    pub total_score: i64,
    pub best_streak: u32,
}

/// Rank players: total score desc, best streak desc, join order asc.
/// Ranks are dense integers starting at 1.
pub fn rank(players: &[PlayerStanding]) -> Vec<LeaderboardRow> {
    let mut sorted: Vec<&PlayerStanding> = players.iter().collect();
    sorted.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(b.best_streak.cmp(&a.best_streak))
            .then(a.join_order.cmp(&b.join_order))
    });
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, p)| LeaderboardRow {
            rank: i as u32 + 1,
            player_id: p.player_id.clone(),
            display_name: p.display_name.clone(),
            is_teacher: p.is_teacher,
            total_score: p.total_score,
            best_streak: p.best_streak,
        })
        .collect()
}

/// The fixed award catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardKind {
    TopScore,
    LongestStreak,
    MostImproved,
    QuickestMind,
    ComebackKing,
}

impl AwardKind {
    pub fn title(self) -> &'static str {
        match self {
            AwardKind::TopScore => "Top Score",
            AwardKind::LongestStreak => "Longest Streak",
            AwardKind::MostImproved => "Most Improved",
            AwardKind::QuickestMind => "Quickest Mind",
            AwardKind::ComebackKing => "Comeback King",
        }
    }
}

/// A granted award
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    pub award: AwardKind,
    pub title: String,
    pub player_id: String,
    pub display_name: String,
    pub value: i64,
}

/// Per-player inputs for award computation
#[derive(Debug, Clone)]
pub struct AwardCandidate {
    pub player_id: String,
    pub display_name: String,
    pub join_order: usize,
    pub total_score: i64,
    pub best_streak: u32,
    pub first_run_score: Option<i64>,
    pub last_run_score: Option<i64>,
    pub runs: u32,
    pub questions_answered: u32,
    pub avg_time_ms: u64,
    pub credits_earned: u32,
    pub credits_used: u32,
}

/// Compute the deterministic end-of-session awards. Awards whose criteria
/// no player meets are omitted; ties resolve by join order.
pub fn compute_awards(candidates: &[AwardCandidate]) -> Vec<Award> {
    let mut awards = Vec::new();

    let grant = |kind: AwardKind, c: &AwardCandidate, value: i64| Award {
        award: kind,
        title: kind.title().to_string(),
        player_id: c.player_id.clone(),
        display_name: c.display_name.clone(),
        value,
    };

    // Top Score: highest total
    if let Some(c) = best_by(candidates, |c| Some(c.total_score)) {
        awards.push(grant(AwardKind::TopScore, c, c.total_score));
    }

    // Longest Streak: needs at least one correct answer
    if let Some(c) = best_by(candidates, |c| {
        (c.best_streak > 0).then_some(c.best_streak as i64)
    }) {
        awards.push(grant(AwardKind::LongestStreak, c, c.best_streak as i64));
    }

    // Most Improved: largest last − first run delta, at least two runs
    if let Some(c) = best_by(candidates, |c| match (c.first_run_score, c.last_run_score) {
        (Some(first), Some(last)) if c.runs >= 2 => Some(last - first),
        _ => None,
    }) {
        let delta = c.last_run_score.unwrap_or(0) - c.first_run_score.unwrap_or(0);
        awards.push(grant(AwardKind::MostImproved, c, delta));
    }

    // Quickest Mind: lowest average answer time among players with >= 5
    // answered (negate so best_by's max picks the minimum)
    if let Some(c) = best_by(candidates, |c| {
        (c.questions_answered >= 5).then_some(-(c.avg_time_ms as i64))
    }) {
        awards.push(grant(AwardKind::QuickestMind, c, c.avg_time_ms as i64));
    }

    // Comeback King: highest used/earned credit ratio, scaled to permille
    if let Some(c) = best_by(candidates, |c| {
        (c.credits_used >= 1)
            .then(|| c.credits_used as i64 * 1000 / c.credits_earned.max(1) as i64)
    }) {
        awards.push(grant(AwardKind::ComebackKing, c, c.credits_used as i64));
    }

    awards
}

/// Highest key wins; earlier join order breaks ties; `None` keys are
/// ineligible.
fn best_by<F>(candidates: &[AwardCandidate], key: F) -> Option<&AwardCandidate>
where
    F: Fn(&AwardCandidate) -> Option<i64>,
{
    candidates
        .iter()
        .filter_map(|c| key(c).map(|k| (c, k)))
        .max_by(|(a, ka), (b, kb)| ka.cmp(kb).then(b.join_order.cmp(&a.join_order)))
        .map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(id: &str, order: usize, score: i64, streak: u32) -> PlayerStanding {
        PlayerStanding {
            player_id: id.to_string(),
            display_name: id.to_uppercase(),
            is_teacher: false,
            join_order: order,
            total_score: score,
            best_streak: streak,
        }
    }

    fn candidate(id: &str, order: usize) -> AwardCandidate {
        AwardCandidate {
            player_id: id.to_string(),
            display_name: id.to_uppercase(),
            join_order: order,
            total_score: 0,
            best_streak: 0,
            first_run_score: None,
            last_run_score: None,
            runs: 0,
            questions_answered: 0,
            avg_time_ms: 0,
            credits_earned: 0,
            credits_used: 0,
        }
    }

    #[test]
    fn ranking_orders_by_score_streak_then_join_order() {
        let rows = rank(&[
            standing("a", 0, 100, 2),
            standing("b", 1, 200, 0),
            standing("c", 2, 100, 5),
            standing("d", 3, 100, 2),
        ]);
        let order: Vec<&str> = rows.iter().map(|r| r.player_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a", "d"]);
        assert_eq!(
            rows.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn awards_respect_eligibility_thresholds() {
        let mut a = candidate("a", 0);
        a.total_score = 500;
        a.best_streak = 4;
        a.questions_answered = 3;
        a.avg_time_ms = 900;

        let mut b = candidate("b", 1);
        b.total_score = 300;
        b.best_streak = 2;
        b.questions_answered = 6;
        b.avg_time_ms = 2500;
        b.first_run_score = Some(10);
        b.last_run_score = Some(90);
        b.runs = 4;
        b.credits_earned = 4;
        b.credits_used = 2;

        let awards = compute_awards(&[a, b]);
        let by_kind = |k: AwardKind| awards.iter().find(|aw| aw.award == k);

        assert_eq!(by_kind(AwardKind::TopScore).unwrap().player_id, "a");
        assert_eq!(by_kind(AwardKind::LongestStreak).unwrap().player_id, "a");
        // a has too few answers for Quickest Mind despite the faster average
        assert_eq!(by_kind(AwardKind::QuickestMind).unwrap().player_id, "b");
        let improved = by_kind(AwardKind::MostImproved).unwrap();
        assert_eq!(improved.player_id, "b");
        assert_eq!(improved.value, 80);
        assert_eq!(by_kind(AwardKind::ComebackKing).unwrap().player_id, "b");
    }

    #[test]
    fn award_ties_resolve_by_join_order() {
        let mut a = candidate("a", 3);
        a.total_score = 100;
        let mut b = candidate("b", 1);
        b.total_score = 100;

        let awards = compute_awards(&[a, b]);
        let top = awards
            .iter()
            .find(|aw| aw.award == AwardKind::TopScore)
            .unwrap();
        assert_eq!(top.player_id, "b");
    }

    #[test]
    fn no_credit_no_comeback_award() {
        let awards = compute_awards(&[candidate("a", 0)]);
        assert!(awards.iter().all(|aw| aw.award != AwardKind::ComebackKing));
        assert!(awards.iter().all(|aw| aw.award != AwardKind::QuickestMind));
        assert!(awards.iter().all(|aw| aw.award != AwardKind::MostImproved));
    }
}
