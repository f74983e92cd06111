use crate::error::BattleError;
use crate::types::{Bet, Payout};

/// Sum of every bet amount, right and wrong predictions alike.
pub fn total_pool(bets: &[Bet]) -> Result<u64, BattleError> {
    bets.iter()
        .try_fold(0u64, |acc, bet| acc.checked_add(bet.amount))
        .ok_or(BattleError::PoolOverflow)
}

/// Splits the whole bet pool among the bettors who picked `winner`,
/// proportionally to their stake and rounded down.
///
/// Returns an empty list when nobody picked the winner; the pool is then left
/// unassigned.
pub fn calculate_betting_payouts(bets: &[Bet], winner: &str) -> Result<Vec<Payout>, BattleError> {
    let correct: Vec<&Bet> = bets.iter().filter(|b| b.predicted_winner == winner).collect();

    if correct.is_empty() {
        return Ok(Vec::new());
    }

    let pool = total_pool(bets)? as u128;
    // bounded by the pool, which already fits in u64
    let total_correct: u128 = correct.iter().map(|b| b.amount as u128).sum();

    if total_correct == 0 {
        return Ok(Vec::new());
    }

    Ok(correct
        .into_iter()
        .map(|bet| Payout {
            recipient: bet.bettor.clone(),
            amount: (bet.amount as u128 * pool / total_correct) as u64,
        })
        .collect())
}

/// Part of the pool that floor division (or a lack of winners) left unpaid.
pub fn unallocated(bets: &[Bet], payouts: &[Payout]) -> Result<u64, BattleError> {
    let pool = total_pool(bets)?;
    let paid: u64 = payouts.iter().map(|p| p.amount).sum();
    Ok(pool.saturating_sub(paid))
}
