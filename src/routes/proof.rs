use axum::{Json, http::StatusCode};

use crate::proof::{MerkleTree, decode_hash, verify};
use crate::types::{ProofRequest, ProofResponse, VerifyRequest, VerifyResponse};

pub async fn get_proof(Json(payload): Json<ProofRequest>) -> Result<Json<ProofResponse>, (StatusCode, String)> {
    let tree = MerkleTree::from_battle_result(&payload.battle_result)?;

    let leaf = tree.find_leaf(&payload.player, payload.amount).ok_or((
        StatusCode::NOT_FOUND,
        "Player payout not found in battle result".to_string(),
    ))?;

    let proof = tree.proof_hex(&leaf.hash)?;

    Ok(Json(ProofResponse {
        proof,
        leaf_hash: hex::encode(leaf.hash),
        amount: payload.amount,
    }))
}

pub async fn verify_proof(Json(payload): Json<VerifyRequest>) -> Result<Json<VerifyResponse>, (StatusCode, String)> {
    let bad = |what: &str| (StatusCode::BAD_REQUEST, format!("{what} is not a 32-byte hex hash"));

    let root = decode_hash(&payload.root).ok_or_else(|| bad("root"))?;
    let leaf = decode_hash(&payload.leaf_hash).ok_or_else(|| bad("leafHash"))?;
    let proof = payload
        .proof
        .iter()
        .map(|h| decode_hash(h).ok_or_else(|| bad("proof element")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(VerifyResponse {
        valid: verify(&root, &leaf, &proof),
    }))
}
