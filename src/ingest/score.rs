//! Trust score: a 0-100 heuristic derived from a politician's stored
//! attributes. Pure and deterministic; no external input.

use crate::orm::politicians;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryOrder, Set};

pub const BASE_SCORE: i32 = 50;
pub const INCUMBENCY_BONUS: i32 = 10;
/// Participation contributes at most this much in either direction.
pub const PARTICIPATION_SPAN: f64 = 30.0;
pub const COMMITTEE_POINTS: i32 = 3;
pub const COMMITTEE_CAP: i32 = 15;
pub const POSITION_POINTS: i32 = 2;
pub const POSITION_CAP: i32 = 10;

fn participation(record: &politicians::VotingRecord) -> i32 {
    let total = record.total();
    if total == 0 {
        return 0;
    }
    let cast = record.yes.max(0).saturating_add(record.no.max(0)) as f64;
    (((cast / total as f64) - 0.5) * PARTICIPATION_SPAN).round() as i32
}

fn expense(total: f64) -> i32 {
    let total = if total.is_finite() { total.max(0.0) } else { 0.0 };
    match total {
        t if t == 0.0 => 0,
        t if t < 300_000.0 => 10,
        t if t < 500_000.0 => 5,
        t if t < 750_000.0 => 0,
        t if t < 1_000_000.0 => -5,
        _ => -15,
    }
}

fn capped(count: usize, points: i32, cap: i32) -> i32 {
    let count = i32::try_from(count).unwrap_or(i32::MAX);
    count.saturating_mul(points).min(cap)
}

pub fn trust_score(p: &politicians::Model) -> i32 {
    let incumbency = if p.is_incumbent { INCUMBENCY_BONUS } else { 0 };

    let score = BASE_SCORE
        + incumbency
        + participation(&p.voting_record)
        + expense(p.expenses.total)
        + capped(p.committees.len(), COMMITTEE_POINTS, COMMITTEE_CAP)
        + capped(p.policy_positions.len(), POSITION_POINTS, POSITION_CAP);

    score.clamp(0, 100)
}

/// Rewrite the stored score of every politician. Returns how many rows
/// were scored.
pub async fn calculate_trust_scores<C>(db: &C) -> Result<u32, DbErr>
where
    C: ConnectionTrait,
{
    let all = politicians::Entity::find()
        .order_by_asc(politicians::Column::Id)
        .all(db)
        .await?;

    let mut scored = 0;
    for politician in all {
        let score = trust_score(&politician);
        let mut active: politicians::ActiveModel = politician.into();
        active.trust_score = Set(score);
        active.update(db).await?;
        scored += 1;
    }

    log::info!("Trust scores calculated for {} politicians", scored);
    crate::cache::invalidate_all_politician_details();
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::politicians::{ContactInfo, Expenses, StringList, VotingRecord};

    fn base() -> politicians::Model {
        let now = chrono::Utc::now().naive_utc();
        politicians::Model {
            id: 1,
            name: "Test Member".to_string(),
            party: None,
            position: None,
            riding: None,
            level: "federal".to_string(),
            jurisdiction: "Canada".to_string(),
            trust_score: 0,
            civic_level: None,
            bio: None,
            policy_positions: StringList::default(),
            voting_record: VotingRecord::default(),
            contact_info: ContactInfo::default(),
            committees: StringList::default(),
            expenses: Expenses::default(),
            is_incumbent: false,
            parliament_member_id: None,
            source_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn strings(n: usize) -> StringList {
        StringList((0..n).map(|i| format!("item {}", i)).collect())
    }

    #[test]
    fn test_blank_politician_scores_base() {
        assert_eq!(trust_score(&base()), 50);
    }

    #[test]
    fn test_component_sum() {
        let mut p = base();
        p.is_incumbent = true;
        p.voting_record = VotingRecord { yes: 80, no: 10, abstain: 10 };
        p.expenses.total = 250_000.0;
        p.committees = strings(2);
        p.policy_positions = strings(3);

        // 50 + 10 + round((0.9 - 0.5) * 30) + 10 + 6 + 6
        assert_eq!(trust_score(&p), 94);
    }

    #[test]
    fn test_expense_bands() {
        assert_eq!(expense(0.0), 0);
        assert_eq!(expense(-10.0), 0);
        assert_eq!(expense(299_999.0), 10);
        assert_eq!(expense(300_000.0), 5);
        assert_eq!(expense(500_000.0), 0);
        assert_eq!(expense(750_000.0), -5);
        assert_eq!(expense(1_000_000.0), -15);
        assert_eq!(expense(f64::NAN), 0);
    }

    #[test]
    fn test_caps() {
        let mut p = base();
        p.committees = strings(40);
        p.policy_positions = strings(40);
        assert_eq!(trust_score(&p), 50 + 15 + 10);
    }

    #[test]
    fn test_bounds_hold_for_extremes() {
        let mut low = base();
        low.voting_record = VotingRecord { yes: 0, no: 0, abstain: i64::MAX };
        low.expenses.total = 10_000_000.0;
        let s = trust_score(&low);
        assert!((0..=100).contains(&s));
        assert_eq!(s, 50 - 15 - 15);

        let mut high = base();
        high.is_incumbent = true;
        high.voting_record = VotingRecord { yes: i64::MAX, no: i64::MAX, abstain: 0 };
        high.expenses.total = 1.0;
        high.committees = strings(100);
        high.policy_positions = strings(100);
        let s = trust_score(&high);
        assert!((0..=100).contains(&s));
        assert_eq!(s, 100);
    }

    #[test]
    fn test_deterministic() {
        let mut p = base();
        p.voting_record = VotingRecord { yes: 3, no: 4, abstain: 5 };
        p.expenses.total = 612_345.0;
        assert_eq!(trust_score(&p), trust_score(&p.clone()));
    }
}
