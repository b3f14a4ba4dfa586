use std::sync::atomic::AtomicBool;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;

use powsig_core::block::Block;
use powsig_core::config::EngineConfig;
use powsig_core::crypto::{Schema, Signature};
use powsig_core::miner::{Miner, MinerState};
use powsig_core::payload::*;
use powsig_core::transaction::Transaction;


#[test]
fn test_signed_transaction_to_mined_block() {
    let schema = Schema::new();
    let mut rng = StdRng::seed_from_u64(2024);
    let alice = schema.gen_pair(&mut rng);
    let miner_pair = schema.gen_pair(&mut rng);

    // Alice signs a transfer and submits it
    let tx = Transaction::build(&mut rng, "alice", "bob", 25,
                                alice.private_key(), &schema).unwrap();
    assert!(tx.verify(alice.public_key(), &schema));
    let action = submit_transaction_action(&tx).unwrap();

    // The service bundles it into a pending block
    let record = match action.to_value()["action_data"].clone() {
        serde_json::Value::Object(obj) => obj,
        other => panic!("unexpected action data {:?}", other),
    };
    let feed = json!({
        "pending_blocks": [{
            "index": "b-1",
            "previousHash": "0",
            "data": [record],
            "criterion": {"type": "leading_zeros", "difficulty": 2},
            "timestamp": "1714000000.125",
        }]
    });
    let mut blocks = parse_pending_feed(&feed).unwrap();
    let block: Block = blocks.remove(0);
    assert_eq!(block.transactions[0], tx);

    // Mine it
    let config = EngineConfig { progress_interval: 64, ..EngineConfig::default() };
    let mut miner = Miner::new(block.clone(), &config);
    let cancel = AtomicBool::new(false);
    let solution = miner.run(&cancel, |_| {}).unwrap().unwrap();
    assert_eq!(miner.state(), MinerState::Solved);
    assert!(solution.hash.starts_with("00"));
    assert!(miner.block().check_pow().unwrap());

    // Report it signed by the miner
    let action = mined_block_validation(&mut rng, &block, &solution, "miner",
                                        miner_pair.private_key(), &schema)
        .unwrap();
    let data = match action {
        Action::MinedBlockValidation(data) => data,
        other => panic!("unexpected action {:?}", other),
    };
    let signature = Signature::from_strings(&data.signature).unwrap();
    assert!(schema.check_signature(solution.hash.as_bytes(),
                                   miner_pair.public_key(), &signature));
    assert!(data.verify(&block, miner_pair.public_key(), &schema).unwrap());
    assert!(!data.verify(&block, alice.public_key(), &schema).unwrap());
}


#[cfg(feature = "worker")]
#[tokio::test]
async fn test_worker_session() {
    use powsig_core::criterion::CriterionRecord;
    use powsig_core::worker::{MiningSession, WorkerMessage};

    let block = Block::new("1", "0", vec![Transaction::new("a", "b", 1)],
                           CriterionRecord::leading_zeros(1), "1");

    let mut session = MiningSession::new(EngineConfig::default());
    let worker = session.mine(block.clone()).unwrap();

    let solved = loop {
        match worker.next_message().await {
            Some(WorkerMessage::Solved { nonce, hash, .. }) => break (nonce, hash),
            Some(WorkerMessage::Progress { .. }) => continue,
            other => panic!("unexpected message {:?}", other),
        }
    };

    assert!(solved.1.starts_with('0'));
    assert_eq!(block.get_hash_with_nonce(&solved.0), solved.1);
    session.stop();
}
