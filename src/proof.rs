use ethers::utils::keccak256;

use crate::error::BattleError;
use crate::types::BattleResult;

pub type Hash32 = [u8; 32];

/// Width the amount is zero-padded to inside a leaf preimage.
pub const AMOUNT_WIDTH: usize = 32;

/// keccak256(recipient bytes ++ amount as a 32-char zero-padded decimal)
pub fn hash_leaf(recipient: &str, amount: u64) -> Hash32 {
    let mut encoded = Vec::with_capacity(recipient.len() + AMOUNT_WIDTH);
    encoded.extend_from_slice(recipient.as_bytes());
    encoded.extend_from_slice(format!("{amount:0>width$}", width = AMOUNT_WIDTH).as_bytes());
    keccak256(encoded)
}

/// Parent of two siblings. The smaller hash always goes first, so the result
/// does not depend on which side each child sits on.
pub fn hash_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };

    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(first);
    buf[32..].copy_from_slice(second);
    keccak256(buf)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleLeaf {
    pub recipient: String,
    pub amount: u64,
    pub hash: Hash32,
}

/// Payout commitment for one battle.
///
/// `leaves` keeps the payout order (winner first). The hashed base layer is
/// sorted, which makes the root a function of the payout multiset only. A
/// node left without a partner on an odd level moves up unchanged.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: Vec<MerkleLeaf>,
    layers: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    pub fn from_battle_result(result: &BattleResult) -> Result<Self, BattleError> {
        if result.winner.is_empty() {
            return Err(BattleError::InvalidBattleResult);
        }

        let payouts = std::iter::once((result.winner.as_str(), result.winner_amount)).chain(
            result
                .betting_payouts
                .iter()
                .map(|p| (p.recipient.as_str(), p.amount)),
        );

        Self::from_payouts(payouts)
    }

    pub fn from_payouts<'a, I>(payouts: I) -> Result<Self, BattleError>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let leaves: Vec<MerkleLeaf> = payouts
            .into_iter()
            .map(|(recipient, amount)| MerkleLeaf {
                recipient: recipient.to_string(),
                amount,
                hash: hash_leaf(recipient, amount),
            })
            .collect();

        if leaves.is_empty() {
            return Err(BattleError::InvalidBattleResult);
        }

        let mut base: Vec<Hash32> = leaves.iter().map(|l| l.hash).collect();
        base.sort_unstable();

        let mut layers = vec![base];

        while let Some(current) = layers.last().filter(|level| level.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [lone] => *lone,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();

            layers.push(next);
        }

        Ok(Self { leaves, layers })
    }

    pub fn root(&self) -> Hash32 {
        // construction guarantees a single-node top layer
        self.layers[self.layers.len() - 1][0]
    }

    pub fn root_hex(&self) -> String {
        hex::encode(self.root())
    }

    pub fn leaves(&self) -> &[MerkleLeaf] {
        &self.leaves
    }

    /// Leaf entry for an exact `(recipient, amount)` pair.
    pub fn find_leaf(&self, recipient: &str, amount: u64) -> Option<&MerkleLeaf> {
        self.leaves
            .iter()
            .find(|l| l.recipient == recipient && l.amount == amount)
    }

    /// Sibling hashes from `leaf_hash` up to the root. Levels where the node
    /// was promoted contribute nothing.
    pub fn proof(&self, leaf_hash: &Hash32) -> Result<Vec<Hash32>, BattleError> {
        let mut index = self.layers[0]
            .iter()
            .position(|h| h == leaf_hash)
            .ok_or(BattleError::LeafNotFound)?;

        let mut proof = Vec::with_capacity(self.layers.len());

        for level in &self.layers[..self.layers.len() - 1] {
            if let Some(sibling) = level.get(index ^ 1) {
                proof.push(*sibling);
            }
            index /= 2;
        }

        Ok(proof)
    }

    pub fn proof_hex(&self, leaf_hash: &Hash32) -> Result<Vec<String>, BattleError> {
        Ok(self.proof(leaf_hash)?.iter().map(hex::encode).collect())
    }
}

/// Recomputes the root from a leaf and its proof and compares it to `root`.
pub fn verify(root: &Hash32, leaf_hash: &Hash32, proof: &[Hash32]) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf_hash, |current, sibling| hash_pair(&current, sibling));

    computed == *root
}

pub fn decode_hash(value: &str) -> Option<Hash32> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(raw).ok()?.try_into().ok()
}
