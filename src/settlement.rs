//! Battle settlement.
//!
//! [`compute`] is the pure part: rank, pay out, commit. [`Settler`] wraps it
//! with the two collaborators a settlement talks to, the wallet data provider
//! and the content store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::BattleError;
use crate::payout::{calculate_betting_payouts, unallocated};
use crate::proof::MerkleTree;
use crate::ranking::rank_participants;
use crate::store::ContentStore;
use crate::types::{BattleResult, Bet, ParticipantSnapshot, SettlementReceipt, SettlementRecord};
use crate::wallet::WalletDataProvider;

/// Upper bound on wallet fetches in flight during one settlement.
pub const MAX_CONCURRENT_FETCHES: usize = 4;

/// Result of fetching one participant's snapshot.
#[derive(Debug)]
pub enum FetchOutcome {
    Found(ParticipantSnapshot),
    Absent(String),
    Failed(String, anyhow::Error),
}

/// Everything the pure settlement step produces.
#[derive(Debug, Clone)]
pub struct ComputedSettlement {
    pub snapshots: Vec<ParticipantSnapshot>,
    pub result: BattleResult,
    pub tree: MerkleTree,
    pub unallocated: u64,
}

/// Ranks `snapshots`, pays out correct bettors from the whole bet pool and
/// commits to the payouts. The winner receives `prize_pool`.
pub fn compute(
    battle_id: &str,
    snapshots: Vec<ParticipantSnapshot>,
    bets: &[Bet],
    prize_pool: u64,
) -> Result<ComputedSettlement, BattleError> {
    let ranking = rank_participants(snapshots)?;
    let betting_payouts = calculate_betting_payouts(bets, &ranking.winner)?;
    let unallocated = unallocated(bets, &betting_payouts)?;

    let result = BattleResult {
        battle_id: battle_id.to_string(),
        winner: ranking.winner,
        winner_amount: prize_pool,
        betting_payouts,
    };

    let tree = MerkleTree::from_battle_result(&result)?;

    Ok(ComputedSettlement {
        snapshots: ranking.snapshots,
        result,
        tree,
        unallocated,
    })
}

pub struct Settler {
    wallets: Arc<dyn WalletDataProvider>,
    store: Arc<dyn ContentStore>,
}

impl Settler {
    pub fn new(wallets: Arc<dyn WalletDataProvider>, store: Arc<dyn ContentStore>) -> Self {
        Self { wallets, store }
    }

    pub fn wallets(&self) -> &dyn WalletDataProvider {
        self.wallets.as_ref()
    }

    /// Fetches every distinct player, at most [`MAX_CONCURRENT_FETCHES`] at a
    /// time. Never fails as a whole; each player gets its own outcome, in
    /// request order.
    pub async fn fetch_snapshots(&self, players: &[String]) -> Vec<FetchOutcome> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = players.iter().filter(|p| seen.insert(p.as_str())).collect();
        let wallets = &self.wallets;

        stream::iter(unique.into_iter().cloned())
            .map(|player: String| async move {
                match wallets.fetch_snapshot(&player).await {
                    Ok(Some(snapshot)) => FetchOutcome::Found(snapshot),
                    Ok(None) => FetchOutcome::Absent(player.clone()),
                    Err(err) => FetchOutcome::Failed(player.clone(), err),
                }
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await
    }

    pub async fn settle(
        &self,
        battle_id: &str,
        players: &[String],
        bets: &[Bet],
        prize_pool: u64,
    ) -> Result<SettlementReceipt, BattleError> {
        let start_time = Utc::now();

        let mut snapshots = Vec::with_capacity(players.len());
        for outcome in self.fetch_snapshots(players).await {
            match outcome {
                FetchOutcome::Found(snapshot) => snapshots.push(snapshot),
                FetchOutcome::Absent(player) => {
                    warn!(battle_id, %player, "no snapshot, dropping participant from ranking");
                }
                FetchOutcome::Failed(player, err) => {
                    warn!(battle_id, %player, error = %format!("{err:#}"), "snapshot fetch failed, dropping participant from ranking");
                }
            }
        }

        let end_time = Utc::now();

        let computed = compute(battle_id, snapshots, bets, prize_pool)?;
        let merkle_root = computed.tree.root_hex();

        let record = SettlementRecord {
            battle_id: battle_id.to_string(),
            start_time,
            end_time,
            players: players.to_vec(),
            snapshots: computed.snapshots,
            winner: computed.result.winner.clone(),
            winner_amount: computed.result.winner_amount,
            betting_payouts: computed.result.betting_payouts,
            unallocated: computed.unallocated,
            merkle_root: merkle_root.clone(),
        };

        let body = serde_json::to_vec_pretty(&record)?;
        let content_handle = self.store.put(&body).await.map_err(BattleError::Storage)?;

        info!(
            battle_id,
            winner = %record.winner,
            payouts = record.betting_payouts.len(),
            unallocated = record.unallocated,
            root = %merkle_root,
            handle = %content_handle,
            store = self.store.name(),
            "battle settled"
        );

        Ok(SettlementReceipt {
            merkle_root,
            content_handle,
        })
    }

    pub async fn load_record(&self, content_handle: &str) -> Result<SettlementRecord, BattleError> {
        let body = self
            .store
            .get(content_handle)
            .await
            .map_err(BattleError::Storage)?
            .ok_or_else(|| BattleError::RecordNotFound(content_handle.to_string()))?;

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{hash_leaf, verify};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Canned wallet data: a known pct, `None` for absent, missing key for failure.
    struct FakeWallets(HashMap<&'static str, Option<Decimal>>);

    #[async_trait]
    impl WalletDataProvider for FakeWallets {
        async fn fetch_snapshot(&self, address: &str) -> Result<Option<ParticipantSnapshot>> {
            match self.0.get(address) {
                Some(Some(pct)) => Ok(Some(ParticipantSnapshot {
                    participant: address.to_string(),
                    performance_pct: *pct,
                    rank: 0,
                    observed_at: Utc::now(),
                    total_value: Decimal::ZERO,
                    tokens: vec![],
                })),
                Some(None) => Ok(None),
                None => Err(anyhow!("upstream 500")),
            }
        }
    }

    #[derive(Default)]
    struct MemoryStore(Mutex<HashMap<String, Vec<u8>>>);

    #[async_trait]
    impl ContentStore for MemoryStore {
        async fn put(&self, record: &[u8]) -> Result<String> {
            let handle = format!("mem-{}", self.0.lock().unwrap().len());
            self.0.lock().unwrap().insert(handle.clone(), record.to_vec());
            Ok(handle)
        }

        async fn get(&self, handle: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.0.lock().unwrap().get(handle).cloned())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ContentStore for BrokenStore {
        async fn put(&self, _record: &[u8]) -> Result<String> {
            Err(anyhow!("store offline"))
        }

        async fn get(&self, _handle: &str) -> Result<Option<Vec<u8>>> {
            Err(anyhow!("store offline"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn players(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn bet(bettor: &str, predicted: &str, amount: u64) -> Bet {
        Bet {
            bettor: bettor.into(),
            predicted_winner: predicted.into(),
            amount,
        }
    }

    fn settler(wallets: FakeWallets) -> Settler {
        Settler::new(Arc::new(wallets), Arc::new(MemoryStore::default()))
    }

    #[test]
    fn compute_is_pure_and_order_insensitive() {
        let snap = |p: &str, pct: Decimal| ParticipantSnapshot {
            participant: p.into(),
            performance_pct: pct,
            rank: 0,
            observed_at: Utc::now(),
            total_value: Decimal::ZERO,
            tokens: vec![],
        };
        let snaps = vec![snap("A", dec!(10)), snap("B", dec!(25)), snap("C", dec!(-5))];

        let bets = vec![bet("X", "B", 100), bet("Y", "A", 50), bet("Z", "B", 300)];
        let mut reversed = bets.clone();
        reversed.reverse();

        let a = compute("b1", snaps.clone(), &bets, 1_000).unwrap();
        let b = compute("b1", snaps, &reversed, 1_000).unwrap();

        assert_eq!(a.result.winner, "B");
        assert_eq!(a.tree.root(), b.tree.root());
        assert_eq!(a.tree.leaves().len(), 3);
        // 100/400*450 and 300/400*450
        assert_eq!(a.result.betting_payouts[0].amount, 112);
        assert_eq!(a.result.betting_payouts[1].amount, 337);
        assert_eq!(a.unallocated, 1);
    }

    #[tokio::test]
    async fn settle_tolerates_partial_fetch_failure() {
        let wallets = FakeWallets(HashMap::from([
            ("A", Some(dec!(10))),
            ("B", Some(dec!(25))),
            ("C", None),
        ]));
        let settler = settler(wallets);

        let bets = vec![bet("X", "B", 100), bet("Y", "A", 50)];
        let receipt = settler
            .settle("battle-7", &players(&["A", "B", "C", "D"]), &bets, 500)
            .await
            .unwrap();

        assert_eq!(receipt.merkle_root.len(), 64);

        let record = settler.load_record(&receipt.content_handle).await.unwrap();
        assert_eq!(record.battle_id, "battle-7");
        assert_eq!(record.winner, "B");
        assert_eq!(record.winner_amount, 500);
        assert_eq!(record.players.len(), 4);
        assert_eq!(record.snapshots.len(), 2);
        assert_eq!(record.snapshots[0].rank, 1);
        assert_eq!(record.merkle_root, receipt.merkle_root);
        assert_eq!(record.betting_payouts.len(), 1);
        assert_eq!(record.betting_payouts[0].amount, 150);

        // the winner's leaf proves against the returned root
        let result = BattleResult {
            battle_id: record.battle_id.clone(),
            winner: record.winner.clone(),
            winner_amount: record.winner_amount,
            betting_payouts: record.betting_payouts.clone(),
        };
        let tree = MerkleTree::from_battle_result(&result).unwrap();
        let leaf = hash_leaf("B", 500);
        assert_eq!(tree.root_hex(), receipt.merkle_root);
        assert!(verify(&tree.root(), &leaf, &tree.proof(&leaf).unwrap()));
    }

    #[tokio::test]
    async fn settle_fails_when_nobody_has_data() {
        let settler = settler(FakeWallets(HashMap::from([("A", None)])));

        let err = settler
            .settle("b", &players(&["A", "B"]), &[], 10)
            .await
            .unwrap_err();
        assert!(matches!(err, BattleError::NoParticipants));
    }

    #[tokio::test]
    async fn duplicate_players_are_fetched_once() {
        let settler = settler(FakeWallets(HashMap::from([("A", Some(dec!(1)))])));

        let outcomes = settler.fetch_snapshots(&players(&["A", "A", "A"])).await;
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], FetchOutcome::Found(_)));
    }

    #[tokio::test]
    async fn fetch_outcomes_are_explicit() {
        let settler = settler(FakeWallets(HashMap::from([("A", Some(dec!(1))), ("B", None)])));

        let outcomes = settler.fetch_snapshots(&players(&["A", "B", "C"])).await;
        assert!(matches!(&outcomes[0], FetchOutcome::Found(s) if s.participant == "A"));
        assert!(matches!(&outcomes[1], FetchOutcome::Absent(p) if p == "B"));
        assert!(matches!(&outcomes[2], FetchOutcome::Failed(p, _) if p == "C"));
    }

    /// Every wallet resolves after a short delay; tracks the peak number of
    /// fetches running at once.
    #[derive(Default)]
    struct SlowWallets {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl WalletDataProvider for SlowWallets {
        async fn fetch_snapshot(&self, address: &str) -> Result<Option<ParticipantSnapshot>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            // later players finish first
            let delay = 20u64.saturating_sub(address.len() as u64);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(ParticipantSnapshot {
                participant: address.to_string(),
                performance_pct: Decimal::ONE,
                rank: 0,
                observed_at: Utc::now(),
                total_value: Decimal::ZERO,
                tokens: vec![],
            }))
        }
    }

    #[tokio::test]
    async fn fetches_are_bounded_and_keep_request_order() {
        let wallets = Arc::new(SlowWallets::default());
        let settler = Settler::new(wallets.clone(), Arc::new(MemoryStore::default()));

        let names: Vec<String> = (1..=12).map(|n| "p".repeat(n)).collect();
        let outcomes = settler.fetch_snapshots(&names).await;

        let fetched: Vec<&str> = outcomes
            .iter()
            .map(|o| match o {
                FetchOutcome::Found(s) => s.participant.as_str(),
                other => panic!("unexpected outcome {other:?}"),
            })
            .collect();
        assert_eq!(fetched, names.iter().map(String::as_str).collect::<Vec<_>>());

        let peak = wallets.peak.load(Ordering::SeqCst);
        assert!(peak <= MAX_CONCURRENT_FETCHES, "peak {peak}");
        assert!(peak > 1);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let wallets = FakeWallets(HashMap::from([("A", Some(dec!(1)))]));
        let settler = Settler::new(Arc::new(wallets), Arc::new(BrokenStore));

        let err = settler.settle("b", &players(&["A"]), &[], 10).await.unwrap_err();
        assert!(matches!(err, BattleError::Storage(_)));
        assert!(err.to_string().contains("store offline"));

        let err = settler.load_record("mem-0").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unknown_handle_is_not_found() {
        let settler = settler(FakeWallets(HashMap::new()));

        let err = settler.load_record("mem-404").await.unwrap_err();
        assert!(matches!(&err, BattleError::RecordNotFound(h) if h == "mem-404"));
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }
}
