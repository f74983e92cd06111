use crate::error::BattleError;
use crate::types::ParticipantSnapshot;

#[derive(Debug, Clone)]
pub struct Ranking {
    pub winner: String,
    pub snapshots: Vec<ParticipantSnapshot>,
}

/// Orders snapshots by performance, best first, and fills in `rank`.
///
/// Equal performances keep their input order.
pub fn rank_participants(mut snapshots: Vec<ParticipantSnapshot>) -> Result<Ranking, BattleError> {
    if snapshots.is_empty() {
        return Err(BattleError::NoParticipants);
    }

    snapshots.sort_by(|a, b| b.performance_pct.cmp(&a.performance_pct));

    for (idx, snapshot) in snapshots.iter_mut().enumerate() {
        snapshot.rank = idx as u32 + 1;
    }

    let winner = snapshots[0].participant.clone();

    Ok(Ranking { winner, snapshots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn snap(participant: &str, pct: Decimal) -> ParticipantSnapshot {
        ParticipantSnapshot {
            participant: participant.to_string(),
            performance_pct: pct,
            rank: 0,
            observed_at: Utc::now(),
            total_value: Decimal::ZERO,
            tokens: vec![],
        }
    }

    #[test]
    fn best_performer_wins() {
        let ranking = rank_participants(vec![
            snap("A", dec!(10)),
            snap("B", dec!(25)),
            snap("C", dec!(-5)),
        ])
        .unwrap();

        assert_eq!(ranking.winner, "B");
        let order: Vec<(&str, u32)> = ranking
            .snapshots
            .iter()
            .map(|s| (s.participant.as_str(), s.rank))
            .collect();
        assert_eq!(order, vec![("B", 1), ("A", 2), ("C", 3)]);
    }

    #[test]
    fn ties_keep_input_order() {
        let ranking = rank_participants(vec![
            snap("first", dec!(3.5)),
            snap("second", dec!(3.50)),
            snap("low", dec!(-1)),
        ])
        .unwrap();

        assert_eq!(ranking.winner, "first");
        assert_eq!(ranking.snapshots[1].participant, "second");
        assert_eq!(ranking.snapshots[1].rank, 2);
    }

    #[test]
    fn all_negative_still_has_a_winner() {
        let ranking = rank_participants(vec![snap("a", dec!(-12.1)), snap("b", dec!(-0.4))]).unwrap();
        assert_eq!(ranking.winner, "b");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(rank_participants(vec![]), Err(BattleError::NoParticipants)));
    }
}
